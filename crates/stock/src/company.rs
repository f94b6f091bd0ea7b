//! Company consistency between a record and the records it links to.

use serde::{Deserialize, Serialize};

use depot_core::{CompanyId, DomainError, DomainResult};

/// Reference to a linked record together with the company that owns it.
///
/// `company_id == None` marks a company-agnostic record (shared by every
/// company of the tenant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompanyScoped<T> {
    pub id: T,
    pub company_id: Option<CompanyId>,
}

impl<T> CompanyScoped<T> {
    pub fn new(id: T, company_id: Option<CompanyId>) -> Self {
        Self { id, company_id }
    }

    pub fn shared(id: T) -> Self {
        Self {
            id,
            company_id: None,
        }
    }

    /// Whether this record may be linked from a record owned by `owner`.
    pub fn fits(&self, owner: CompanyId) -> bool {
        self.company_id.is_none_or(|c| c == owner)
    }
}

/// Reject a link to a record owned by a different company.
pub fn ensure_company<T>(owner: CompanyId, linked: &CompanyScoped<T>, what: &str) -> DomainResult<()> {
    if linked.fits(owner) {
        Ok(())
    } else {
        Err(DomainError::company_mismatch(what))
    }
}

/// Same check between two optional owners (company-agnostic records on either side pass).
pub fn ensure_compatible(
    owner: Option<CompanyId>,
    linked: Option<CompanyId>,
    what: &str,
) -> DomainResult<()> {
    match (owner, linked) {
        (Some(a), Some(b)) if a != b => Err(DomainError::company_mismatch(what)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_records_fit_every_company() {
        let linked = CompanyScoped::shared(1u8);
        assert!(ensure_company(CompanyId::new(), &linked, "Location").is_ok());
    }

    #[test]
    fn foreign_records_are_rejected() {
        let linked = CompanyScoped::new(1u8, Some(CompanyId::new()));
        let err = ensure_company(CompanyId::new(), &linked, "Location").unwrap_err();
        assert_eq!(
            err,
            DomainError::InvariantViolation("Location must belong to the same company".to_string())
        );
    }

    #[test]
    fn optional_owners_only_clash_when_both_are_set() {
        let a = CompanyId::new();
        assert!(ensure_compatible(None, Some(a), "x").is_ok());
        assert!(ensure_compatible(Some(a), None, "x").is_ok());
        assert!(ensure_compatible(Some(a), Some(a), "x").is_ok());
        assert!(ensure_compatible(Some(a), Some(CompanyId::new()), "x").is_err());
    }
}
