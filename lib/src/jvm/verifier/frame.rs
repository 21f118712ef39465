use super::VerificationType;
use crate::jvm::code::{BranchInstruction, Instruction, InvokeType, Label};
use crate::jvm::{BinaryName, FieldType, VerifierErrorKind};
use crate::util::Width;

/// Snapshot of the stack and local variables at a point in the bytecode
///
/// `long` and `double` take up one stack entry but two local variable slots (the second of which
/// is [`VerificationType::Top`]).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Frame {
    /// Local variables, one entry per slot
    pub locals: Vec<VerificationType>,

    /// Types of values on the stack (top of the stack last)
    pub stack: Vec<VerificationType>,
}

impl Frame {
    /// Frame on entry to a method
    pub fn entry(
        is_static: bool,
        parameters: &[FieldType<BinaryName>],
        max_locals: usize,
    ) -> Frame {
        let mut locals = vec![];
        if !is_static {
            locals.push(VerificationType::Reference);
        }
        for parameter in parameters {
            let typ = VerificationType::from(parameter);
            locals.push(typ);
            if typ.width() == 2 {
                locals.push(VerificationType::Top);
            }
        }
        if locals.len() < max_locals {
            locals.resize(max_locals, VerificationType::Top);
        }
        Frame {
            locals,
            stack: vec![],
        }
    }

    /// Frame on entry to an exception handler covering an instruction with this frame
    pub fn for_handler(&self) -> Frame {
        Frame {
            locals: self.locals.clone(),
            stack: vec![VerificationType::Reference],
        }
    }

    /// Merge another frame into this one, returning whether anything changed
    pub fn merge(&mut self, other: &Frame) -> Result<bool, VerifierErrorKind> {
        if self.stack.len() != other.stack.len() {
            return Err(VerifierErrorKind::IncompatibleStackHeights(
                self.stack.len(),
                other.stack.len(),
            ));
        }
        let mut changed = false;
        let pairs = self
            .stack
            .iter_mut()
            .zip(&other.stack)
            .chain(self.locals.iter_mut().zip(&other.locals));
        for (mine, theirs) in pairs {
            let merged = mine.merge(*theirs);
            if merged != *mine {
                *mine = merged;
                changed = true;
            }
        }
        Ok(changed)
    }

    /// Update the frame to reflect the effects of the given (non-branching) instruction
    pub fn verify_instruction(&mut self, insn: &Instruction) -> Result<(), VerifierErrorKind> {
        verify_instruction(self, insn)
    }

    /// Update the frame to reflect the effects of the given branching instruction
    ///
    /// The resulting frame is the one flowing into jump targets and the next instruction (`jsr`
    /// excepted: its target additionally sees the return address on the stack).
    pub fn verify_branch_instruction(
        &mut self,
        insn: &BranchInstruction<Label>,
        return_type: &Option<FieldType<BinaryName>>,
    ) -> Result<(), VerifierErrorKind> {
        verify_branch_instruction(self, insn, return_type)
    }
}

fn verify_instruction(frame: &mut Frame, insn: &Instruction) -> Result<(), VerifierErrorKind> {
    use Instruction::*;
    use VerificationType::*;

    let Frame {
        ref mut stack,
        ref mut locals,
    } = frame;

    match insn {
        Nop => (),
        AConstNull => stack.push(Reference),
        IConstM1 | IConst0 | IConst1 | IConst2 | IConst3 | IConst4 | IConst5 | BiPush(_)
        | SiPush(_) => stack.push(Integer),
        LConst0 | LConst1 => stack.push(Long),
        FConst0 | FConst1 | FConst2 => stack.push(Float),
        DConst0 | DConst1 => stack.push(Double),
        Ldc(constant) => stack.push(VerificationType::of_constant(constant)),

        ILoad(offset) => load(locals, stack, *offset, Integer)?,
        LLoad(offset) => load(locals, stack, *offset, Long)?,
        FLoad(offset) => load(locals, stack, *offset, Float)?,
        DLoad(offset) => load(locals, stack, *offset, Double)?,
        ALoad(offset) => load(locals, stack, *offset, Reference)?,

        IALoad | BALoad | CALoad | SALoad => array_load(stack, Integer)?,
        LALoad => array_load(stack, Long)?,
        FALoad => array_load(stack, Float)?,
        DALoad => array_load(stack, Double)?,
        AALoad => array_load(stack, Reference)?,

        IStore(offset) => store(locals, stack, *offset, Integer)?,
        LStore(offset) => store(locals, stack, *offset, Long)?,
        FStore(offset) => store(locals, stack, *offset, Float)?,
        DStore(offset) => store(locals, stack, *offset, Double)?,
        AStore(offset) => {
            // `astore` is also how a subroutine stashes its return address
            let typ = match stack.last() {
                Some(ReturnAddress) => ReturnAddress,
                _ => Reference,
            };
            store(locals, stack, *offset, typ)?;
        }

        IAStore | BAStore | CAStore | SAStore => array_store(stack, Integer)?,
        LAStore => array_store(stack, Long)?,
        FAStore => array_store(stack, Float)?,
        DAStore => array_store(stack, Double)?,
        AAStore => array_store(stack, Reference)?,

        Pop => {
            pop_slots(stack, 1)?;
        }
        Pop2 => {
            pop_slots(stack, 2)?;
        }
        Dup => {
            let top = pop_slots(stack, 1)?;
            stack.extend_from_slice(&top);
            stack.extend_from_slice(&top);
        }
        DupX1 | DupX2 => {
            let top = pop_slots(stack, 1)?;
            let under = pop_slots(stack, if matches!(insn, DupX1) { 1 } else { 2 })?;
            stack.extend_from_slice(&top);
            stack.extend_from_slice(&under);
            stack.extend_from_slice(&top);
        }
        Dup2 => {
            let top = pop_slots(stack, 2)?;
            stack.extend_from_slice(&top);
            stack.extend_from_slice(&top);
        }
        Dup2X1 | Dup2X2 => {
            let top = pop_slots(stack, 2)?;
            let under = pop_slots(stack, if matches!(insn, Dup2X1) { 1 } else { 2 })?;
            stack.extend_from_slice(&top);
            stack.extend_from_slice(&under);
            stack.extend_from_slice(&top);
        }
        Swap => {
            let top = pop_slots(stack, 1)?;
            let under = pop_slots(stack, 1)?;
            stack.extend_from_slice(&top);
            stack.extend_from_slice(&under);
        }

        IAdd | ISub | IMul | IDiv | IRem | IAnd | IOr | IXor | ISh(_) => {
            binary(stack, Integer, Integer, Integer)?
        }
        LAdd | LSub | LMul | LDiv | LRem | LAnd | LOr | LXor => binary(stack, Long, Long, Long)?,
        FAdd | FSub | FMul | FDiv | FRem => binary(stack, Float, Float, Float)?,
        DAdd | DSub | DMul | DDiv | DRem => binary(stack, Double, Double, Double)?,
        LSh(_) => binary(stack, Long, Integer, Long)?,
        INeg | I2B | I2C | I2S => unary(stack, Integer, Integer)?,
        LNeg => unary(stack, Long, Long)?,
        FNeg => unary(stack, Float, Float)?,
        DNeg => unary(stack, Double, Double)?,
        I2L => unary(stack, Integer, Long)?,
        I2F => unary(stack, Integer, Float)?,
        I2D => unary(stack, Integer, Double)?,
        L2I => unary(stack, Long, Integer)?,
        L2F => unary(stack, Long, Float)?,
        L2D => unary(stack, Long, Double)?,
        F2I => unary(stack, Float, Integer)?,
        F2L => unary(stack, Float, Long)?,
        F2D => unary(stack, Float, Double)?,
        D2I => unary(stack, Double, Integer)?,
        D2L => unary(stack, Double, Long)?,
        D2F => unary(stack, Double, Float)?,
        IInc(offset, _) => {
            get_local_expecting_type(locals, *offset, Integer)?;
        }
        LCmp => binary(stack, Long, Long, Integer)?,
        FCmp(_) => binary(stack, Float, Float, Integer)?,
        DCmp(_) => binary(stack, Double, Double, Integer)?,

        GetStatic(field) => stack.push(VerificationType::from(&field.descriptor)),
        PutStatic(field) => {
            pop_expecting_type(stack, VerificationType::from(&field.descriptor))?;
        }
        GetField(field) => {
            pop_expecting_type(stack, Reference)?;
            stack.push(VerificationType::from(&field.descriptor));
        }
        PutField(field) => {
            pop_expecting_type(stack, VerificationType::from(&field.descriptor))?;
            pop_expecting_type(stack, Reference)?;
        }
        Invoke(typ, method) => {
            for parameter in method.descriptor.parameters.iter().rev() {
                pop_expecting_type(stack, VerificationType::from(parameter))?;
            }
            if !matches!(typ, InvokeType::Static) {
                pop_expecting_type(stack, Reference)?;
            }
            if let Some(return_type) = &method.descriptor.return_type {
                stack.push(VerificationType::from(return_type));
            }
        }

        New(_) => stack.push(Reference),
        NewArray(_) | ANewArray(_) => unary(stack, Integer, Reference)?,
        ArrayLength => unary(stack, Reference, Integer)?,
        CheckCast(_) => unary(stack, Reference, Reference)?,
        InstanceOf(_) => unary(stack, Reference, Integer)?,
        MonitorEnter | MonitorExit => {
            pop_expecting_type(stack, Reference)?;
        }
        MultiANewArray(_, dimensions) => {
            for _ in 0..*dimensions {
                pop_expecting_type(stack, Integer)?;
            }
            stack.push(Reference);
        }
        Ret(offset) => {
            get_local_expecting_type(locals, *offset, ReturnAddress)?;
        }
    }

    Ok(())
}

fn verify_branch_instruction(
    frame: &mut Frame,
    insn: &BranchInstruction<Label>,
    return_type: &Option<FieldType<BinaryName>>,
) -> Result<(), VerifierErrorKind> {
    use VerificationType::*;

    let stack = &mut frame.stack;
    let expect_return = |stack: &mut Vec<VerificationType>, typ: VerificationType| {
        match return_type {
            Some(return_type) if VerificationType::from(return_type) == typ => {
                pop_expecting_type(stack, typ).map(|_| ())
            }
            _ => Err(VerifierErrorKind::InvalidReturn),
        }
    };

    match insn {
        BranchInstruction::If(_, _)
        | BranchInstruction::TableSwitch { .. }
        | BranchInstruction::LookupSwitch { .. } => {
            pop_expecting_type(stack, Integer)?;
        }
        BranchInstruction::IfICmp(_, _) => {
            pop_expecting_type(stack, Integer)?;
            pop_expecting_type(stack, Integer)?;
        }
        BranchInstruction::IfACmp(_, _) => {
            pop_expecting_type(stack, Reference)?;
            pop_expecting_type(stack, Reference)?;
        }
        BranchInstruction::IfNull(_, _) | BranchInstruction::AThrow => {
            pop_expecting_type(stack, Reference)?;
        }
        BranchInstruction::Goto(_) | BranchInstruction::Jsr(_) => (),
        BranchInstruction::IReturn => expect_return(stack, Integer)?,
        BranchInstruction::LReturn => expect_return(stack, Long)?,
        BranchInstruction::FReturn => expect_return(stack, Float)?,
        BranchInstruction::DReturn => expect_return(stack, Double)?,
        BranchInstruction::AReturn => expect_return(stack, Reference)?,
        BranchInstruction::Return => {
            if return_type.is_some() {
                return Err(VerifierErrorKind::InvalidReturn);
            }
        }
    }

    Ok(())
}

fn get_local(locals: &[VerificationType], offset: u16) -> Result<VerificationType, VerifierErrorKind> {
    locals
        .get(offset as usize)
        .copied()
        .ok_or(VerifierErrorKind::InvalidLocal(offset))
}

fn get_local_expecting_type(
    locals: &[VerificationType],
    offset: u16,
    expected: VerificationType,
) -> Result<(), VerifierErrorKind> {
    let found = get_local(locals, offset)?;
    if found != expected {
        return Err(VerifierErrorKind::IncompatibleTypes { expected, found });
    }
    Ok(())
}

fn load(
    locals: &[VerificationType],
    stack: &mut Vec<VerificationType>,
    offset: u16,
    typ: VerificationType,
) -> Result<(), VerifierErrorKind> {
    get_local_expecting_type(locals, offset, typ)?;
    stack.push(typ);
    Ok(())
}

fn store(
    locals: &mut [VerificationType],
    stack: &mut Vec<VerificationType>,
    offset: u16,
    typ: VerificationType,
) -> Result<(), VerifierErrorKind> {
    pop_expecting_type(stack, typ)?;
    let idx = offset as usize;
    if idx + typ.width() > locals.len() {
        return Err(VerifierErrorKind::InvalidLocal(offset));
    }

    // Overwriting the second half of a `long` or `double` invalidates the first half
    if idx > 0 && locals[idx - 1].width() == 2 {
        locals[idx - 1] = VerificationType::Top;
    }
    locals[idx] = typ;
    if typ.width() == 2 {
        locals[idx + 1] = VerificationType::Top;
    }
    Ok(())
}

fn pop(stack: &mut Vec<VerificationType>) -> Result<VerificationType, VerifierErrorKind> {
    stack.pop().ok_or(VerifierErrorKind::EmptyStack)
}

fn pop_expecting_type(
    stack: &mut Vec<VerificationType>,
    expected: VerificationType,
) -> Result<VerificationType, VerifierErrorKind> {
    let found = pop(stack)?;
    if found != expected {
        return Err(VerifierErrorKind::IncompatibleTypes { expected, found });
    }
    Ok(found)
}

/// Pop values adding up to exactly `slots` stack slots, returned in stack order
///
/// This is how the untyped stack instructions (`pop2`, `dup_x2`, ...) see the stack.
fn pop_slots(
    stack: &mut Vec<VerificationType>,
    slots: usize,
) -> Result<Vec<VerificationType>, VerifierErrorKind> {
    let mut popped = vec![];
    let mut total = 0;
    while total < slots {
        let value = pop(stack)?;
        total += value.width();
        if total > slots {
            return Err(VerifierErrorKind::InvalidCategory(value));
        }
        popped.push(value);
    }
    popped.reverse();
    Ok(popped)
}

fn unary(
    stack: &mut Vec<VerificationType>,
    argument: VerificationType,
    result: VerificationType,
) -> Result<(), VerifierErrorKind> {
    pop_expecting_type(stack, argument)?;
    stack.push(result);
    Ok(())
}

/// Pop the right operand then the left, then push the result
fn binary(
    stack: &mut Vec<VerificationType>,
    left: VerificationType,
    right: VerificationType,
    result: VerificationType,
) -> Result<(), VerifierErrorKind> {
    pop_expecting_type(stack, right)?;
    pop_expecting_type(stack, left)?;
    stack.push(result);
    Ok(())
}

fn array_load(
    stack: &mut Vec<VerificationType>,
    element: VerificationType,
) -> Result<(), VerifierErrorKind> {
    pop_expecting_type(stack, VerificationType::Integer)?;
    pop_expecting_type(stack, VerificationType::Reference)?;
    stack.push(element);
    Ok(())
}

fn array_store(
    stack: &mut Vec<VerificationType>,
    element: VerificationType,
) -> Result<(), VerifierErrorKind> {
    pop_expecting_type(stack, element)?;
    pop_expecting_type(stack, VerificationType::Integer)?;
    pop_expecting_type(stack, VerificationType::Reference)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use VerificationType::*;

    fn frame(stack: Vec<VerificationType>) -> Frame {
        Frame {
            locals: vec![Integer, Long, Top, Top],
            stack,
        }
    }

    #[test]
    fn entry_frame() {
        let frame = Frame::entry(false, &[FieldType::long(), FieldType::int()], 6);
        assert_eq!(
            frame.locals,
            vec![Reference, Long, Top, Integer, Top, Top]
        );
        assert!(frame.stack.is_empty());
    }

    #[test]
    fn typed_arithmetic() {
        let mut ok = frame(vec![Long, Integer]);
        ok.verify_instruction(&Instruction::LSh(crate::jvm::code::ShiftType::Left))
            .unwrap();
        assert_eq!(ok.stack, vec![Long]);

        let mut bad = frame(vec![Float, Integer]);
        assert!(matches!(
            bad.verify_instruction(&Instruction::IAdd),
            Err(VerifierErrorKind::IncompatibleTypes {
                expected: Integer,
                found: Float
            })
        ));
    }

    #[test]
    fn category_sensitive_stack_ops() {
        let mut dup2 = frame(vec![Long]);
        dup2.verify_instruction(&Instruction::Dup2).unwrap();
        assert_eq!(dup2.stack, vec![Long, Long]);

        let mut dup_x2 = frame(vec![Integer, Float, Reference]);
        dup_x2.verify_instruction(&Instruction::DupX2).unwrap();
        assert_eq!(dup_x2.stack, vec![Reference, Integer, Float, Reference]);

        let mut pop = frame(vec![Double]);
        assert!(matches!(
            pop.verify_instruction(&Instruction::Pop),
            Err(VerifierErrorKind::InvalidCategory(Double))
        ));
    }

    #[test]
    fn locals() {
        let mut store = frame(vec![Integer]);
        store.verify_instruction(&Instruction::IStore(2)).unwrap();
        assert_eq!(store.locals, vec![Integer, Top, Integer, Top]);

        let mut load = frame(vec![]);
        assert!(matches!(
            load.verify_instruction(&Instruction::ILoad(9)),
            Err(VerifierErrorKind::InvalidLocal(9))
        ));
        load.verify_instruction(&Instruction::LLoad(1)).unwrap();
        assert_eq!(load.stack, vec![Long]);
    }

    #[test]
    fn merging_frames() {
        let mut a = frame(vec![Integer]);
        let b = Frame {
            locals: vec![Float, Long, Top, Top],
            stack: vec![Integer],
        };
        assert!(a.merge(&b).unwrap());
        assert_eq!(a.locals[0], Top);
        assert!(!a.merge(&b).unwrap());
        assert!(matches!(
            a.merge(&frame(vec![])),
            Err(VerifierErrorKind::IncompatibleStackHeights(1, 0))
        ));
    }

    #[test]
    fn returns() {
        let mut frame = frame(vec![Integer]);
        assert!(matches!(
            frame.verify_branch_instruction(&BranchInstruction::IReturn, &None),
            Err(VerifierErrorKind::InvalidReturn)
        ));
        frame
            .verify_branch_instruction(&BranchInstruction::IReturn, &Some(FieldType::boolean()))
            .unwrap();
    }
}
