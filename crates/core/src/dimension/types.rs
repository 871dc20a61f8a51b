//! Dimension types.
//!
//! Five orthogonal classifications can tag an entry line: department,
//! project, customer, supplier, employee. The balance index is keyed by all
//! five; the absent reference is the sentinel id `0`, never null, so keys
//! stay uniform.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The id used when an entry carries no reference for a dimension type.
pub const DIMENSION_NONE: i64 = 0;

/// The kinds of auxiliary dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionType {
    /// Organizational department.
    Department,
    /// Project or job.
    Project,
    /// Customer (drives receivables).
    Customer,
    /// Supplier (drives payables).
    Supplier,
    /// Employee.
    Employee,
}

impl DimensionType {
    /// All dimension types, in balance-key order.
    pub const ALL: [Self; 5] = [
        Self::Department,
        Self::Project,
        Self::Customer,
        Self::Supplier,
        Self::Employee,
    ];
}

impl fmt::Display for DimensionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Department => "department",
            Self::Project => "project",
            Self::Customer => "customer",
            Self::Supplier => "supplier",
            Self::Employee => "employee",
        };
        f.write_str(s)
    }
}

/// A dimension value, with its own code+name namespace per type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dimension {
    /// Surrogate id; `0` is reserved as the absent sentinel.
    pub id: i64,
    /// Which dimension this value belongs to.
    pub dim_type: DimensionType,
    /// Code, unique within the type.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Optional parent for hierarchical dimensions.
    pub parent_id: Option<i64>,
    /// Free-form extra payload.
    pub extra: Option<String>,
    /// Disabled values reject new references but keep history.
    pub is_enabled: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// The five dimension references an entry line carries.
///
/// `0` means absent; part of every balance key.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct DimensionRefs {
    /// Department id or `0`.
    #[serde(default)]
    pub dept_id: i64,
    /// Project id or `0`.
    #[serde(default)]
    pub project_id: i64,
    /// Customer id or `0`.
    #[serde(default)]
    pub customer_id: i64,
    /// Supplier id or `0`.
    #[serde(default)]
    pub supplier_id: i64,
    /// Employee id or `0`.
    #[serde(default)]
    pub employee_id: i64,
}

impl DimensionRefs {
    /// References with every dimension absent.
    pub const NONE: Self = Self {
        dept_id: DIMENSION_NONE,
        project_id: DIMENSION_NONE,
        customer_id: DIMENSION_NONE,
        supplier_id: DIMENSION_NONE,
        employee_id: DIMENSION_NONE,
    };

    /// References tagging only a customer.
    #[must_use]
    pub fn customer(customer_id: i64) -> Self {
        Self {
            customer_id,
            ..Self::NONE
        }
    }

    /// References tagging only a supplier.
    #[must_use]
    pub fn supplier(supplier_id: i64) -> Self {
        Self {
            supplier_id,
            ..Self::NONE
        }
    }

    /// The id for a given dimension type.
    #[must_use]
    pub fn get(&self, dim_type: DimensionType) -> i64 {
        match dim_type {
            DimensionType::Department => self.dept_id,
            DimensionType::Project => self.project_id,
            DimensionType::Customer => self.customer_id,
            DimensionType::Supplier => self.supplier_id,
            DimensionType::Employee => self.employee_id,
        }
    }

    /// Sets the id for a given dimension type.
    pub fn set(&mut self, dim_type: DimensionType, id: i64) {
        match dim_type {
            DimensionType::Department => self.dept_id = id,
            DimensionType::Project => self.project_id = id,
            DimensionType::Customer => self.customer_id = id,
            DimensionType::Supplier => self.supplier_id = id,
            DimensionType::Employee => self.employee_id = id,
        }
    }

    /// Iterates the non-sentinel references.
    pub fn present(&self) -> impl Iterator<Item = (DimensionType, i64)> + '_ {
        DimensionType::ALL
            .into_iter()
            .map(|t| (t, self.get(t)))
            .filter(|(_, id)| *id != DIMENSION_NONE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_is_default() {
        assert_eq!(DimensionRefs::default(), DimensionRefs::NONE);
        assert_eq!(DimensionRefs::NONE.dept_id, DIMENSION_NONE);
    }

    #[test]
    fn test_get_set_roundtrip() {
        let mut refs = DimensionRefs::NONE;
        refs.set(DimensionType::Project, 7);
        assert_eq!(refs.get(DimensionType::Project), 7);
        assert_eq!(refs.get(DimensionType::Customer), DIMENSION_NONE);
    }

    #[test]
    fn test_present_skips_sentinels() {
        let refs = DimensionRefs::customer(3);
        let present: Vec<_> = refs.present().collect();
        assert_eq!(present, vec![(DimensionType::Customer, 3)]);
    }
}
