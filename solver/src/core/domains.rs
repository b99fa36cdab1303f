use std::fmt::{Debug, Formatter};

use fixedbitset::FixedBitSet;
use smallvec::SmallVec;

use crate::backtrack::{Backtrack, DecLvl, Trail};
use crate::collections::ref_store::RefVec;
use crate::core::{CellId, IntCst};

/// Read-only access to the current domains of the cells.
///
/// This is the only capability handed to consistency checkers: they may inspect domains but any change
/// must be requested from the owner of the domains.
pub trait DomainView {
    /// Number of candidate values left in the domain of `cell`.
    fn size(&self, cell: CellId) -> usize;

    fn contains(&self, cell: CellId, value: IntCst) -> bool;

    /// All candidate values of `cell`, in increasing order.
    fn candidates(&self, cell: CellId) -> SmallVec<[IntCst; 8]>;

    fn is_singleton(&self, cell: CellId) -> bool {
        self.size(cell) == 1
    }

    /// Returns the value of the cell if it is determined (its domain is a singleton), `None` otherwise.
    fn value(&self, cell: CellId) -> Option<IntCst> {
        if self.is_singleton(cell) {
            self.candidates(cell).first().copied()
        } else {
            None
        }
    }
}

/// Error raised when an update would leave a cell with an empty domain.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct InvalidUpdate {
    pub cell: CellId,
    pub value: IntCst,
}

/// Domain of a single cell: a set of non-negative integers.
#[derive(Clone)]
struct CellDomain {
    values: FixedBitSet,
    size: usize,
}

impl CellDomain {
    fn new(values: impl IntoIterator<Item = IntCst>) -> Self {
        let mut set = FixedBitSet::new();
        for v in values {
            assert!(v >= 0, "negative value {v} in a cell domain");
            let v = v as usize;
            set.grow(v + 1);
            set.insert(v);
        }
        let size = set.count_ones(..);
        CellDomain { values: set, size }
    }

    fn contains(&self, value: IntCst) -> bool {
        value >= 0 && self.values.contains(value as usize)
    }

    fn remove(&mut self, value: IntCst) {
        debug_assert!(self.contains(value));
        self.values.set(value as usize, false);
        self.size -= 1;
    }

    fn insert(&mut self, value: IntCst) {
        debug_assert!(!self.contains(value));
        self.values.insert(value as usize);
        self.size += 1;
    }

    fn iter(&self) -> impl Iterator<Item = IntCst> + '_ {
        self.values.ones().map(|v| v as IntCst)
    }
}

impl Debug for CellDomain {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.size == 1 {
            write!(f, "{}", self.iter().next().unwrap_or_default())
        } else {
            write!(f, "{{")?;
            for (i, v) in self.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{v}")?;
            }
            write!(f, "}}")
        }
    }
}

/// A change to a domain, recorded so that it can be undone on backtrack.
#[derive(Copy, Clone, Debug)]
struct Removal {
    cell: CellId,
    value: IntCst,
}

/// Backtrackable store of finite-domain cells.
///
/// Domains can only shrink, through [Domains::remove] or [Domains::fix], and every change is undone when
/// restoring a previous save point.
#[derive(Clone, Default)]
pub struct Domains {
    cells: RefVec<CellId, CellDomain>,
    trail: Trail<Removal>,
}

impl Domains {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new cell whose domain is the given set of values.
    ///
    /// # Panics
    ///
    /// If any value is negative.
    pub fn new_cell(&mut self, values: impl IntoIterator<Item = IntCst>) -> CellId {
        self.cells.push(CellDomain::new(values))
    }

    /// Creates a new cell with domain `[lb, ub]`.
    pub fn new_cell_range(&mut self, lb: IntCst, ub: IntCst) -> CellId {
        self.new_cell(lb..=ub)
    }

    /// Creates a cell that is already determined to `value`.
    pub fn new_fixed(&mut self, value: IntCst) -> CellId {
        self.new_cell([value])
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// Removes `value` from the domain of `cell`.
    ///
    /// Returns `Ok(true)` if the domain changed, `Ok(false)` if the value was already absent and an error
    /// if `value` was the last candidate of the cell.
    pub fn remove(&mut self, cell: CellId, value: IntCst) -> Result<bool, InvalidUpdate> {
        let dom = &mut self.cells[cell];
        if !dom.contains(value) {
            return Ok(false);
        }
        if dom.size == 1 {
            return Err(InvalidUpdate { cell, value });
        }
        dom.remove(value);
        self.trail.push(Removal { cell, value });
        Ok(true)
    }

    /// Restricts the domain of `cell` to the single value `value`.
    ///
    /// Returns `Ok(true)` if the domain changed and an error if `value` is not a candidate of the cell.
    pub fn fix(&mut self, cell: CellId, value: IntCst) -> Result<bool, InvalidUpdate> {
        if !self.cells[cell].contains(value) {
            return Err(InvalidUpdate { cell, value });
        }
        let others: SmallVec<[IntCst; 8]> = self.cells[cell].iter().filter(|&v| v != value).collect();
        for &v in &others {
            self.remove(cell, v)?;
        }
        Ok(!others.is_empty())
    }

    /// Removes from the domain of `cell` all values that are not in `allowed`.
    pub fn restrict(&mut self, cell: CellId, allowed: &[IntCst]) -> Result<bool, InvalidUpdate> {
        let removed: SmallVec<[IntCst; 8]> = self.cells[cell].iter().filter(|v| !allowed.contains(v)).collect();
        let mut changed = false;
        for v in removed {
            changed |= self.remove(cell, v)?;
        }
        Ok(changed)
    }
}

impl DomainView for Domains {
    fn size(&self, cell: CellId) -> usize {
        self.cells[cell].size
    }

    fn contains(&self, cell: CellId, value: IntCst) -> bool {
        self.cells[cell].contains(value)
    }

    fn candidates(&self, cell: CellId) -> SmallVec<[IntCst; 8]> {
        self.cells[cell].iter().collect()
    }

    fn value(&self, cell: CellId) -> Option<IntCst> {
        let dom = &self.cells[cell];
        if dom.size == 1 {
            dom.iter().next()
        } else {
            None
        }
    }
}

impl Backtrack for Domains {
    fn save_state(&mut self) -> DecLvl {
        self.trail.save_state()
    }

    fn num_saved(&self) -> u32 {
        self.trail.num_saved()
    }

    fn restore_last(&mut self) {
        let cells = &mut self.cells;
        self.trail.restore_last_with(|Removal { cell, value }| cells[cell].insert(value));
    }
}

impl Debug for Domains {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.cells.entries()).finish()
    }
}
