//! This module contains the AST of JVM bytecode. The representation is slightly different from
//! the usual presentation to make it more convenient to rewrite bytecode. For instance:
//!
//!   - The "wide" instruction doesn't show up at all, but instead gets merged into the
//!     instructions it is allowed to modify
//!
//!   - Some instructions (like the branches) get abstracted into one instruction with a field.
//!     This helps with repetitive pattern matches and also simplifies tasks like inverting a
//!     branch condition.
//!
//!   - `ldc`, `ldc_w`, and `ldc2_w` are all [`Instruction::Ldc`], `goto` and `goto_w` are both
//!     [`BranchInstruction::Goto`]. The short or wide form is picked when the method is encoded.
//!
//!   - Operands are resolved out of the constant pool, so a field access carries the owner,
//!     name, and descriptor of the field rather than an index.
//!
//! `invokedynamic` is not represented at all: classes old enough to be supported never contain
//! it.

use crate::jvm::class_file::class_constant_text;
use crate::jvm::{
    BaseType, BinaryName, FieldType, MethodDescriptor, Name, RefType, RenderDescriptor,
    UnqualifiedName,
};
use crate::util::Width;
use std::fmt;
use std::ops::Not;

use super::Label;

/// Constant which can be loaded with `ldc` (or one of its variants)
#[derive(Clone, Debug, PartialEq)]
pub enum ConstantData {
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(String),
    Class(RefType<BinaryName>),
}

impl Width for ConstantData {
    fn width(&self) -> usize {
        match self {
            ConstantData::Long(_) | ConstantData::Double(_) => 2,
            _ => 1,
        }
    }
}

/// Symbolic reference to a field
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub owner: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: FieldType<BinaryName>,
}

/// Symbolic reference to a method
///
/// The owner can be an array type (eg. `clone` on `[I`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub owner: RefType<BinaryName>,
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor<BinaryName>,
    pub is_interface: bool,
}

/// Non-branching JVM bytecode instruction
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    Nop,
    AConstNull,
    IConstM1,
    IConst0,
    IConst1,
    IConst2,
    IConst3,
    IConst4,
    IConst5,
    LConst0,
    LConst1,
    FConst0,
    FConst1,
    FConst2,
    DConst0,
    DConst1,
    BiPush(i8),
    SiPush(i16),
    Ldc(ConstantData), // covers `ldc`, `ldc_w`, and `ldc2_w`
    ILoad(u16),        // covers `iload`, `iload{0,3}`, and `wide iload`
    LLoad(u16),
    FLoad(u16),
    DLoad(u16),
    ALoad(u16),
    IALoad,
    LALoad,
    FALoad,
    DALoad,
    AALoad,
    BALoad,
    CALoad,
    SALoad,
    IStore(u16), // covers `istore`, `istore{0,3}`, and `wide istore`
    LStore(u16),
    FStore(u16),
    DStore(u16),
    AStore(u16),
    IAStore,
    LAStore,
    FAStore,
    DAStore,
    AAStore,
    BAStore,
    CAStore,
    SAStore,
    Pop,
    Pop2,
    Dup,
    DupX1,
    DupX2,
    Dup2,
    Dup2X1,
    Dup2X2,
    Swap,
    IAdd,
    LAdd,
    FAdd,
    DAdd,
    ISub,
    LSub,
    FSub,
    DSub,
    IMul,
    LMul,
    FMul,
    DMul,
    IDiv,
    LDiv,
    FDiv,
    DDiv,
    IRem,
    LRem,
    FRem,
    DRem,
    INeg,
    LNeg,
    FNeg,
    DNeg,
    ISh(ShiftType), // covers `ishr`, `ishl`, and `iushr`
    LSh(ShiftType), // covers `lshr`, `lshl`, and `lushr`
    IAnd,
    LAnd,
    IOr,
    LOr,
    IXor,
    LXor,
    IInc(u16, i16), // covers `iinc` and `wide iinc`
    I2L,
    I2F,
    I2D,
    L2I,
    L2F,
    L2D,
    F2I,
    F2L,
    F2D,
    D2I,
    D2L,
    D2F,
    I2B,
    I2C,
    I2S,
    LCmp,
    FCmp(CompareMode), // covers `fcmpl` and `fcmpg`
    DCmp(CompareMode), // covers `dcmpl` and `dcmpg`
    GetStatic(FieldRef),
    PutStatic(FieldRef),
    GetField(FieldRef),
    PutField(FieldRef),
    Invoke(InvokeType, MethodRef),
    New(RefType<BinaryName>),
    NewArray(BaseType),
    ANewArray(RefType<BinaryName>),
    ArrayLength,
    CheckCast(RefType<BinaryName>),
    InstanceOf(RefType<BinaryName>),
    MonitorEnter,
    MonitorExit,
    MultiANewArray(RefType<BinaryName>, u8),
    Ret(u16), // covers `ret` and `wide ret`
}

impl Instruction {
    /// Shortest instruction pushing an `int` constant
    pub fn push_int(value: i32) -> Instruction {
        match value {
            -1 => Instruction::IConstM1,
            0 => Instruction::IConst0,
            1 => Instruction::IConst1,
            2 => Instruction::IConst2,
            3 => Instruction::IConst3,
            4 => Instruction::IConst4,
            5 => Instruction::IConst5,
            _ => {
                if let Ok(byte) = i8::try_from(value) {
                    Instruction::BiPush(byte)
                } else if let Ok(short) = i16::try_from(value) {
                    Instruction::SiPush(short)
                } else {
                    Instruction::Ldc(ConstantData::Integer(value))
                }
            }
        }
    }

    /// If this instruction pushes a constant `int`, which one
    pub fn int_constant(&self) -> Option<i32> {
        match self {
            Instruction::IConstM1 => Some(-1),
            Instruction::IConst0 => Some(0),
            Instruction::IConst1 => Some(1),
            Instruction::IConst2 => Some(2),
            Instruction::IConst3 => Some(3),
            Instruction::IConst4 => Some(4),
            Instruction::IConst5 => Some(5),
            Instruction::BiPush(b) => Some(*b as i32),
            Instruction::SiPush(s) => Some(*s as i32),
            Instruction::Ldc(ConstantData::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    /// Local variable slot read or written, along with how many slots are touched
    pub fn local_slot(&self) -> Option<(u16, usize)> {
        match self {
            Instruction::ILoad(idx)
            | Instruction::FLoad(idx)
            | Instruction::ALoad(idx)
            | Instruction::IStore(idx)
            | Instruction::FStore(idx)
            | Instruction::AStore(idx)
            | Instruction::IInc(idx, _)
            | Instruction::Ret(idx) => Some((*idx, 1)),
            Instruction::LLoad(idx)
            | Instruction::DLoad(idx)
            | Instruction::LStore(idx)
            | Instruction::DStore(idx) => Some((*idx, 2)),
            _ => None,
        }
    }

    /// Operand stack slots popped and then pushed by the instruction
    ///
    /// `long` and `double` count for two slots.
    pub fn stack_effect(&self) -> (usize, usize) {
        use Instruction::*;
        match self {
            Nop | IInc(_, _) | Ret(_) => (0, 0),
            AConstNull | IConstM1 | IConst0 | IConst1 | IConst2 | IConst3 | IConst4 | IConst5
            | FConst0 | FConst1 | FConst2 | BiPush(_) | SiPush(_) => (0, 1),
            LConst0 | LConst1 | DConst0 | DConst1 => (0, 2),
            Ldc(constant) => (0, constant.width()),
            ILoad(_) | FLoad(_) | ALoad(_) => (0, 1),
            LLoad(_) | DLoad(_) => (0, 2),
            IALoad | FALoad | AALoad | BALoad | CALoad | SALoad => (2, 1),
            LALoad | DALoad => (2, 2),
            IStore(_) | FStore(_) | AStore(_) => (1, 0),
            LStore(_) | DStore(_) => (2, 0),
            IAStore | FAStore | AAStore | BAStore | CAStore | SAStore => (3, 0),
            LAStore | DAStore => (4, 0),
            Pop => (1, 0),
            Pop2 => (2, 0),
            Dup => (1, 2),
            DupX1 => (2, 3),
            DupX2 => (3, 4),
            Dup2 => (2, 4),
            Dup2X1 => (3, 5),
            Dup2X2 => (4, 6),
            Swap => (2, 2),
            IAdd | ISub | IMul | IDiv | IRem | IAnd | IOr | IXor | ISh(_) => (2, 1),
            FAdd | FSub | FMul | FDiv | FRem => (2, 1),
            LAdd | LSub | LMul | LDiv | LRem | LAnd | LOr | LXor => (4, 2),
            DAdd | DSub | DMul | DDiv | DRem => (4, 2),
            LSh(_) => (3, 2),
            INeg | FNeg => (1, 1),
            LNeg | DNeg => (2, 2),
            I2L | I2D | F2L | F2D => (1, 2),
            I2F | F2I | I2B | I2C | I2S => (1, 1),
            L2I | L2F | D2I | D2F => (2, 1),
            L2D | D2L => (2, 2),
            LCmp | DCmp(_) => (4, 1),
            FCmp(_) => (2, 1),
            GetStatic(field) => (0, field.descriptor.width()),
            PutStatic(field) => (field.descriptor.width(), 0),
            GetField(field) => (1, field.descriptor.width()),
            PutField(field) => (1 + field.descriptor.width(), 0),
            Invoke(typ, method) => {
                let has_this = !matches!(typ, InvokeType::Static);
                let pops = method.descriptor.parameter_length(has_this);
                let pushes = method.descriptor.return_type.as_ref().map_or(0, |ret| ret.width());
                (pops, pushes)
            }
            New(_) => (0, 1),
            NewArray(_) | ANewArray(_) | ArrayLength | CheckCast(_) | InstanceOf(_) => (1, 1),
            MonitorEnter | MonitorExit => (1, 0),
            MultiANewArray(_, dimensions) => (*dimensions as usize, 1),
        }
    }
}

/// Branching JVM bytecode instruction
///
/// The type parameter abstracts over the representation of jump targets: [`Label`]s while the
/// method is being edited, absolute byte offsets while decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BranchInstruction<Lbl> {
    If(OrdComparison, Lbl), // covers `ifeq`, `ifne`, `iflt`, `ifge`, `ifgt`, `ifle`
    IfICmp(OrdComparison, Lbl), // covers `if_icmpeq`, `if_icmpne`, `if_icmplt`, ... `if_icmple`
    IfACmp(EqComparison, Lbl), // covers `if_acmpeq`, `if_acmpne`
    IfNull(EqComparison, Lbl), // covers `ifnull`, `ifnonnull`
    Goto(Lbl),                 // covers `goto` and `goto_w`
    Jsr(Lbl),                  // covers `jsr` and `jsr_w`
    TableSwitch {
        /// Jump target if the argument is less than `low` or greater than
        /// `low + targets.len()`
        default: Lbl,

        /// Value associated with the first jump target
        low: i32,

        /// Jump targets
        targets: Vec<Lbl>,
    },
    LookupSwitch {
        /// Jump target if there is no corresponding key
        default: Lbl,

        /// Jump targets (sorted so that the keys are ascending)
        targets: Vec<(i32, Lbl)>,
    },
    IReturn,
    LReturn,
    FReturn,
    DReturn,
    AReturn,
    Return,
    AThrow,
}

impl<Lbl: Copy> BranchInstruction<Lbl> {
    /// Can execution continue on to the next instruction in the list?
    ///
    /// `jsr` counts as falling through, since the subroutine returns to the next instruction.
    pub fn falls_through(&self) -> bool {
        !matches!(
            self,
            BranchInstruction::Goto(_)
                | BranchInstruction::TableSwitch { .. }
                | BranchInstruction::LookupSwitch { .. }
                | BranchInstruction::IReturn
                | BranchInstruction::LReturn
                | BranchInstruction::FReturn
                | BranchInstruction::DReturn
                | BranchInstruction::AReturn
                | BranchInstruction::Return
                | BranchInstruction::AThrow
        )
    }

    /// Every explicit jump target (excluding the fall through)
    pub fn jump_targets(&self) -> Vec<Lbl> {
        match self {
            BranchInstruction::If(_, lbl)
            | BranchInstruction::IfICmp(_, lbl)
            | BranchInstruction::IfACmp(_, lbl)
            | BranchInstruction::IfNull(_, lbl)
            | BranchInstruction::Goto(lbl)
            | BranchInstruction::Jsr(lbl) => vec![*lbl],
            BranchInstruction::TableSwitch {
                default, targets, ..
            } => std::iter::once(*default)
                .chain(targets.iter().copied())
                .collect(),
            BranchInstruction::LookupSwitch { default, targets } => std::iter::once(*default)
                .chain(targets.iter().map(|(_, lbl)| *lbl))
                .collect(),
            BranchInstruction::IReturn
            | BranchInstruction::LReturn
            | BranchInstruction::FReturn
            | BranchInstruction::DReturn
            | BranchInstruction::AReturn
            | BranchInstruction::Return
            | BranchInstruction::AThrow => vec![],
        }
    }

    pub fn map_labels<Lbl2, E>(
        &self,
        mut map_label: impl FnMut(&Lbl) -> Result<Lbl2, E>,
    ) -> Result<BranchInstruction<Lbl2>, E> {
        use BranchInstruction::*;
        Ok(match self {
            If(ord, lbl) => If(*ord, map_label(lbl)?),
            IfICmp(ord, lbl) => IfICmp(*ord, map_label(lbl)?),
            IfACmp(eq, lbl) => IfACmp(*eq, map_label(lbl)?),
            IfNull(eq, lbl) => IfNull(*eq, map_label(lbl)?),
            Goto(lbl) => Goto(map_label(lbl)?),
            Jsr(lbl) => Jsr(map_label(lbl)?),
            TableSwitch {
                default,
                low,
                targets,
            } => TableSwitch {
                default: map_label(default)?,
                low: *low,
                targets: targets
                    .iter()
                    .map(&mut map_label)
                    .collect::<Result<_, _>>()?,
            },
            LookupSwitch { default, targets } => LookupSwitch {
                default: map_label(default)?,
                targets: targets
                    .iter()
                    .map(|(key, lbl)| Ok((*key, map_label(lbl)?)))
                    .collect::<Result<_, _>>()?,
            },
            IReturn => IReturn,
            LReturn => LReturn,
            FReturn => FReturn,
            DReturn => DReturn,
            AReturn => AReturn,
            Return => Return,
            AThrow => AThrow,
        })
    }

    /// Operand stack slots popped by the instruction
    ///
    /// `jsr` pushes the return address, but only along the edge into the subroutine.
    pub fn stack_pops(&self) -> usize {
        match self {
            BranchInstruction::If(_, _)
            | BranchInstruction::IfNull(_, _)
            | BranchInstruction::TableSwitch { .. }
            | BranchInstruction::LookupSwitch { .. }
            | BranchInstruction::IReturn
            | BranchInstruction::FReturn
            | BranchInstruction::AReturn
            | BranchInstruction::AThrow => 1,
            BranchInstruction::IfICmp(_, _)
            | BranchInstruction::IfACmp(_, _)
            | BranchInstruction::LReturn
            | BranchInstruction::DReturn => 2,
            BranchInstruction::Goto(_) | BranchInstruction::Jsr(_) | BranchInstruction::Return => {
                0
            }
        }
    }
}

/// Entry in an instruction list
#[derive(Clone, Debug, PartialEq)]
pub enum Insn {
    Label(Label),
    Instruction(Instruction),
    Branch(BranchInstruction<Label>),
}

impl Insn {
    pub fn is_label(&self) -> bool {
        matches!(self, Insn::Label(_))
    }

    pub fn as_instruction(&self) -> Option<&Instruction> {
        match self {
            Insn::Instruction(instruction) => Some(instruction),
            _ => None,
        }
    }

    pub fn as_branch(&self) -> Option<&BranchInstruction<Label>> {
        match self {
            Insn::Branch(branch) => Some(branch),
            _ => None,
        }
    }
}

impl From<Instruction> for Insn {
    fn from(instruction: Instruction) -> Insn {
        Insn::Instruction(instruction)
    }
}

impl From<BranchInstruction<Label>> for Insn {
    fn from(branch: BranchInstruction<Label>) -> Insn {
        Insn::Branch(branch)
    }
}

/// Possible bit shifts
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum ShiftType {
    Left,
    LogicalRight,
    ArithmeticRight,
}

/// Comparison modes for floating point
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum CompareMode {
    /// -1 on NaN
    L,

    /// 1 on NaN
    G,
}

/// Binary comparison operators available for `int` branches
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum OrdComparison {
    EQ,
    GE,
    GT,
    LE,
    LT,
    NE,
}

impl Not for OrdComparison {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            OrdComparison::EQ => OrdComparison::NE,
            OrdComparison::GE => OrdComparison::LT,
            OrdComparison::GT => OrdComparison::LE,
            OrdComparison::LE => OrdComparison::GT,
            OrdComparison::LT => OrdComparison::GE,
            OrdComparison::NE => OrdComparison::EQ,
        }
    }
}

/// Equality/inequality comparison operators
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum EqComparison {
    EQ,
    NE,
}

impl Not for EqComparison {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            EqComparison::EQ => EqComparison::NE,
            EqComparison::NE => EqComparison::EQ,
        }
    }
}

/// Type of method to invoke
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum InvokeType {
    Virtual,
    Special,
    Static,
    Interface,
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} : {}", self.owner, self.name, self.descriptor.render())
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}{}",
            class_constant_text(&self.owner),
            self.name,
            self.descriptor.render()
        )
    }
}

impl fmt::Display for ConstantData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantData::Integer(i) => write!(f, "{}", i),
            ConstantData::Float(x) => write!(f, "{}F", x),
            ConstantData::Long(l) => write!(f, "{}L", l),
            ConstantData::Double(d) => write!(f, "{}D", d),
            ConstantData::String(s) => write!(f, "{:?}", s),
            ConstantData::Class(class) => write!(f, "{}.class", class_constant_text(class)),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Ldc(constant) => write!(f, "Ldc {}", constant),
            Instruction::GetStatic(field) => write!(f, "GetStatic {}", field),
            Instruction::PutStatic(field) => write!(f, "PutStatic {}", field),
            Instruction::GetField(field) => write!(f, "GetField {}", field),
            Instruction::PutField(field) => write!(f, "PutField {}", field),
            Instruction::Invoke(typ, method) => write!(f, "Invoke{:?} {}", typ, method),
            Instruction::New(class) => write!(f, "New {}", class_constant_text(class)),
            Instruction::ANewArray(class) => write!(f, "ANewArray {}", class_constant_text(class)),
            Instruction::CheckCast(class) => write!(f, "CheckCast {}", class_constant_text(class)),
            Instruction::InstanceOf(class) => {
                write!(f, "InstanceOf {}", class_constant_text(class))
            }
            Instruction::MultiANewArray(class, dimensions) => write!(
                f,
                "MultiANewArray {} {}",
                class_constant_text(class),
                dimensions
            ),
            other => write!(f, "{:?}", other),
        }
    }
}

impl fmt::Display for Insn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Insn::Label(label) => write!(f, "{:?}:", label),
            Insn::Instruction(instruction) => write!(f, "    {}", instruction),
            Insn::Branch(branch) => write!(f, "    {:?}", branch),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn push_int_picks_shortest_form() {
        assert_eq!(Instruction::push_int(-1), Instruction::IConstM1);
        assert_eq!(Instruction::push_int(5), Instruction::IConst5);
        assert_eq!(Instruction::push_int(-2), Instruction::BiPush(-2));
        assert_eq!(Instruction::push_int(127), Instruction::BiPush(127));
        assert_eq!(Instruction::push_int(128), Instruction::SiPush(128));
        assert_eq!(
            Instruction::push_int(40_000),
            Instruction::Ldc(ConstantData::Integer(40_000))
        );
        for value in [-1, 0, 6, -129, 32767, 32768, i32::MIN] {
            assert_eq!(Instruction::push_int(value).int_constant(), Some(value));
        }
    }

    #[test]
    fn invoke_stack_effect() {
        let method = MethodRef {
            owner: RefType::Object(BinaryName::STRING),
            name: UnqualifiedName::from_str("regionMatches").unwrap(),
            descriptor: MethodDescriptor {
                parameters: vec![FieldType::int(), FieldType::long(), FieldType::double()],
                return_type: Some(FieldType::boolean()),
            },
            is_interface: false,
        };
        let virt = Instruction::Invoke(InvokeType::Virtual, method.clone());
        let stat = Instruction::Invoke(InvokeType::Static, method);
        assert_eq!(virt.stack_effect(), (6, 1));
        assert_eq!(stat.stack_effect(), (5, 1));
    }

    #[test]
    fn branch_targets() {
        let l1 = Label::START.next();
        let l2 = l1.next();
        let switch = BranchInstruction::LookupSwitch {
            default: l1,
            targets: vec![(3, l2), (9, l1)],
        };
        assert_eq!(switch.jump_targets(), vec![l1, l2, l1]);
        assert!(!switch.falls_through());
        assert!(BranchInstruction::If(OrdComparison::EQ, l1).falls_through());
        assert!(BranchInstruction::Jsr(l1).falls_through());
        assert!(!BranchInstruction::<Label>::AThrow.falls_through());
    }

    #[test]
    fn display() {
        let field = FieldRef {
            owner: BinaryName::from_str("client").unwrap(),
            name: UnqualifiedName::from_str("ob").unwrap(),
            descriptor: FieldType::boolean(),
        };
        assert_eq!(
            Instruction::GetStatic(field).to_string(),
            "GetStatic client.ob : Z"
        );
        assert_eq!(Instruction::ILoad(3).to_string(), "ILoad(3)");
    }
}
