/// Number of slots a value occupies on the operand stack or in the locals
///
/// `long` and `double` are the only two-slot values.
pub trait Width {
    fn width(&self) -> usize;
}
