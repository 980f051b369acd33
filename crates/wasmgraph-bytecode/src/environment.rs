//! Function environments and linear memory

use std::cell::Cell;

use crate::MAX_LOCALS;
use crate::error::EnvironmentError;
use crate::operand::LocalIndex;
use crate::signature::FunctionSignature;
use crate::value::{MemType, ValueType};

/// Address range of a bound linear memory (`end` is exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryRegion {
    start: usize,
    end: usize,
}

impl MemoryRegion {
    /// Create a region from raw addresses
    pub fn new(start: usize, end: usize) -> Result<Self, EnvironmentError> {
        if end < start {
            return Err(EnvironmentError::InvalidRegion { start, end });
        }
        Ok(Self { start, end })
    }

    /// First byte address
    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    /// One past the last byte address
    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Size in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the region is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether an access of `mem` at byte `offset` stays inside the region
    pub fn contains(&self, offset: u32, mem: MemType) -> bool {
        (offset as usize)
            .checked_add(mem.size())
            .is_some_and(|end| end <= self.len())
    }
}

/// A fixed-size byte buffer addressed by heap opcodes.
///
/// The buffer never moves or grows, so the address handed out by
/// [`LinearMemory::region`] stays valid for the lifetime of the memory. Bytes are
/// stored in [`Cell`]s: compiled code loads and stores through that address while
/// the host only ever holds shared references, and every accessor takes `&self`.
/// The type is `!Sync`, so a memory and the code addressing it stay on one thread.
#[derive(Debug, Clone)]
pub struct LinearMemory {
    bytes: Box<[Cell<u8>]>,
}

impl LinearMemory {
    /// Create a zero-filled memory of `size` bytes
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![Cell::new(0u8); size].into_boxed_slice(),
        }
    }

    fn from_bytes(bytes: impl Iterator<Item = u8>) -> Self {
        Self {
            bytes: bytes.map(Cell::new).collect(),
        }
    }

    /// Create a memory holding the given int32 elements
    pub fn from_i32s(values: &[i32]) -> Self {
        Self::from_bytes(values.iter().flat_map(|v| v.to_ne_bytes()))
    }

    /// Create a memory holding the given float32 elements
    pub fn from_f32s(values: &[f32]) -> Self {
        Self::from_bytes(values.iter().flat_map(|v| v.to_ne_bytes()))
    }

    /// Create a memory holding the given float64 elements
    pub fn from_f64s(values: &[f64]) -> Self {
        Self::from_bytes(values.iter().flat_map(|v| v.to_ne_bytes()))
    }

    /// Address range of the buffer.
    ///
    /// Code compiled against this region reads and writes the buffer directly.
    /// Calls into such code must not overlap with any other access to the memory.
    pub fn region(&self) -> MemoryRegion {
        let range = self.bytes.as_ptr_range();
        MemoryRegion {
            start: range.start as usize,
            end: range.end as usize,
        }
    }

    /// Size in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the memory is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn read<const N: usize>(&self, offset: usize) -> [u8; N] {
        let mut out = [0u8; N];
        for (byte, cell) in out.iter_mut().zip(&self.bytes[offset..offset + N]) {
            *byte = cell.get();
        }
        out
    }

    fn write(&self, offset: usize, data: &[u8]) {
        for (cell, &byte) in self.bytes[offset..offset + data.len()].iter().zip(data) {
            cell.set(byte);
        }
    }

    /// Read the int32 at byte `offset`. Panics when out of range.
    pub fn read_i32(&self, offset: usize) -> i32 {
        i32::from_ne_bytes(self.read(offset))
    }

    /// Write an int32 at byte `offset`. Panics when out of range.
    pub fn write_i32(&self, offset: usize, value: i32) {
        self.write(offset, &value.to_ne_bytes());
    }

    /// Read the float32 at byte `offset`. Panics when out of range.
    pub fn read_f32(&self, offset: usize) -> f32 {
        f32::from_ne_bytes(self.read(offset))
    }

    /// Write a float32 at byte `offset`. Panics when out of range.
    pub fn write_f32(&self, offset: usize, value: f32) {
        self.write(offset, &value.to_ne_bytes());
    }

    /// Read the float64 at byte `offset`. Panics when out of range.
    pub fn read_f64(&self, offset: usize) -> f64 {
        f64::from_ne_bytes(self.read(offset))
    }

    /// Write a float64 at byte `offset`. Panics when out of range.
    pub fn write_f64(&self, offset: usize, value: f64) {
        self.write(offset, &value.to_ne_bytes());
    }
}

/// Per-function metadata the graph builder decodes against
#[derive(Debug, Clone)]
pub struct Environment {
    signature: FunctionSignature,
    local_int32_count: usize,
    local_float32_count: usize,
    local_float64_count: usize,
    /// Declared (non-parameter) local types in allocation order
    local_types: Vec<ValueType>,
    memory: Option<MemoryRegion>,
}

impl Environment {
    /// Create an environment with no declared locals and no memory
    pub fn new(signature: FunctionSignature) -> Self {
        Self {
            signature,
            local_int32_count: 0,
            local_float32_count: 0,
            local_float64_count: 0,
            local_types: Vec::new(),
            memory: None,
        }
    }

    /// The function signature
    #[inline]
    pub fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    /// Append a local of type `ty` after the parameters and all previously
    /// allocated locals, and return its index
    pub fn allocate_local(&mut self, ty: ValueType) -> Result<LocalIndex, EnvironmentError> {
        let index = self.total_locals();
        if index >= MAX_LOCALS {
            return Err(EnvironmentError::TooManyLocals(index));
        }
        match ty {
            ValueType::Int32 => self.local_int32_count += 1,
            ValueType::Float32 => self.local_float32_count += 1,
            ValueType::Float64 => self.local_float64_count += 1,
        }
        self.local_types.push(ty);
        Ok(LocalIndex(index as u8))
    }

    /// Bind a linear memory region. Allowed once per environment.
    pub fn bind_memory(&mut self, region: MemoryRegion) -> Result<(), EnvironmentError> {
        if self.memory.is_some() {
            return Err(EnvironmentError::MemoryAlreadyBound);
        }
        self.memory = Some(region);
        Ok(())
    }

    /// The bound memory region, if any
    #[inline]
    pub fn memory(&self) -> Option<MemoryRegion> {
        self.memory
    }

    /// Parameters plus declared locals
    #[inline]
    pub fn total_locals(&self) -> usize {
        self.signature.param_count() + self.local_types.len()
    }

    /// Number of declared locals of type `ty`
    pub fn local_count(&self, ty: ValueType) -> usize {
        match ty {
            ValueType::Int32 => self.local_int32_count,
            ValueType::Float32 => self.local_float32_count,
            ValueType::Float64 => self.local_float64_count,
        }
    }

    /// Type of the parameter or declared local at `index`
    pub fn local_type(&self, index: LocalIndex) -> Option<ValueType> {
        let index = index.index() as usize;
        let params = self.signature.params();
        if index < params.len() {
            Some(params[index])
        } else {
            self.local_types.get(index - params.len()).copied()
        }
    }

    /// Types of all locals, parameters first
    pub fn local_types(&self) -> impl Iterator<Item = ValueType> + '_ {
        self.signature
            .params()
            .iter()
            .chain(self.local_types.iter())
            .copied()
    }
}
