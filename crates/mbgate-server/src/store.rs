//! The authoritative bank of holding registers.

/// Largest store the protocol can address (16-bit register addresses).
pub const MAX_REGISTERS: usize = u16::MAX as usize + 1;

/// Errors raised by register store construction and access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The requested size is zero or beyond the addressable range.
    #[error("register store size must be between 1 and {max}, got {size}")]
    InvalidSize { size: usize, max: usize },

    /// The register array could not be allocated.
    #[error("failed to allocate {size} registers")]
    Allocation { size: usize },

    /// An access touched registers outside the store.
    #[error("registers {start}..{} out of range (store holds {size})", .start + .count)]
    OutOfRange {
        start: usize,
        count: usize,
        size: usize,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Fixed-size array of 16-bit holding registers, all initially zero.
///
/// The size is set at construction and never changes. Every access is
/// bounds-checked before anything is read or written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterStore {
    registers: Vec<u16>,
}

impl RegisterStore {
    /// Allocate `size` zeroed registers.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 || size > MAX_REGISTERS {
            return Err(StoreError::InvalidSize {
                size,
                max: MAX_REGISTERS,
            });
        }

        let mut registers = Vec::new();
        registers
            .try_reserve_exact(size)
            .map_err(|_| StoreError::Allocation { size })?;
        registers.resize(size, 0);

        Ok(Self { registers })
    }

    /// Number of registers.
    pub fn len(&self) -> usize {
        self.registers.len()
    }

    /// Always false: a store holds at least one register.
    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    /// Borrow `count` registers beginning at `start`.
    pub fn read(&self, start: u16, count: u16) -> Result<&[u16]> {
        let range = self.range(start, count as usize)?;
        if range.is_empty() {
            return Err(self.out_of_range(start, 0));
        }
        Ok(&self.registers[range])
    }

    /// Store `value` at `address`.
    pub fn write_one(&mut self, address: u16, value: u16) -> Result<()> {
        let range = self.range(address, 1)?;
        self.registers[range.start] = value;
        Ok(())
    }

    /// Store `values` contiguously beginning at `start`.
    pub fn write_many(&mut self, start: u16, values: &[u16]) -> Result<()> {
        let range = self.range(start, values.len())?;
        self.registers[range].copy_from_slice(values);
        Ok(())
    }

    /// Copy of every register, for diagnostics.
    pub fn snapshot(&self) -> Vec<u16> {
        self.registers.clone()
    }

    fn range(&self, start: u16, count: usize) -> Result<std::ops::Range<usize>> {
        let begin = start as usize;
        let end = begin + count;
        if end > self.registers.len() {
            return Err(self.out_of_range(start, count));
        }
        Ok(begin..end)
    }

    fn out_of_range(&self, start: u16, count: usize) -> StoreError {
        StoreError::OutOfRange {
            start: start as usize,
            count,
            size: self.registers.len(),
        }
    }
}
