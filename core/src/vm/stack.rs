use crate::Vec;
use crate::vm::Value;

/// Operand stack of one interpreter frame.
///
/// Values are stored one per entry, but the height is tracked in slots
/// (`long` and `double` take two) so it can be checked against the
/// method's `max_stack`. The check is a debug assertion: verified code never
/// exceeds it.
#[derive(Debug)]
pub struct Stack {
    values: Vec<Value>,
    slots: usize,
    max_slots: usize,
}

impl Stack {
    pub fn new(max_slots: usize) -> Self {
        Self {
            values: Vec::with_capacity(max_slots.min(64)),
            slots: 0,
            max_slots,
        }
    }

    /// # Panics
    ///
    /// Panics in debug mode if the push exceeds `max_slots`.
    #[inline]
    pub fn push(&mut self, value: Value) {
        self.slots += value.size();
        debug_assert!(
            self.slots <= self.max_slots,
            "Stack overflow: {} slots exceed max_stack of {}",
            self.slots,
            self.max_slots
        );
        self.values.push(value);
    }

    #[inline]
    pub fn pop(&mut self) -> Option<Value> {
        let value = self.values.pop()?;
        self.slots -= value.size();
        Some(value)
    }

    #[inline]
    pub fn peek(&self) -> Option<&Value> {
        self.values.last()
    }

    /// Height in slots.
    #[inline]
    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Values from bottom to top.
    pub fn into_vec(self) -> Vec<Value> {
        self.values
    }
}
