use axum::http::HeaderMap;

use depot_core::{CompanyId, TenantId};
use depot_infra::provisioning::TenantContext;

/// Tenant selector; required on every domain route.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// The caller's current company, used for defaults.
pub const COMPANY_HEADER: &str = "x-company-id";

/// Why a request carries no usable tenant context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    MissingTenant,
    InvalidTenant,
    InvalidCompany,
}

impl ContextError {
    pub fn message(&self) -> &'static str {
        match self {
            ContextError::MissingTenant => "X-Tenant-Id header is required",
            ContextError::InvalidTenant => "X-Tenant-Id must be a UUID",
            ContextError::InvalidCompany => "X-Company-Id must be a UUID",
        }
    }
}

/// Read the tenant context from request headers.
pub fn from_headers(headers: &HeaderMap) -> Result<TenantContext, ContextError> {
    let tenant = headers
        .get(TENANT_HEADER)
        .ok_or(ContextError::MissingTenant)?
        .to_str()
        .map_err(|_| ContextError::InvalidTenant)?;
    let tenant_id: TenantId = tenant.trim().parse().map_err(|_| ContextError::InvalidTenant)?;

    let company_id = match headers.get(COMPANY_HEADER) {
        Some(raw) => {
            let raw = raw.to_str().map_err(|_| ContextError::InvalidCompany)?;
            Some(raw.trim().parse::<CompanyId>().map_err(|_| ContextError::InvalidCompany)?)
        }
        None => None,
    };

    Ok(TenantContext::new(tenant_id, company_id))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn tenant_is_required_and_company_optional() {
        let mut headers = HeaderMap::new();
        assert_eq!(from_headers(&headers), Err(ContextError::MissingTenant));

        let tenant_id = TenantId::new();
        headers.insert(TENANT_HEADER, HeaderValue::from_str(&tenant_id.to_string()).unwrap());
        let ctx = from_headers(&headers).unwrap();
        assert_eq!(ctx.tenant_id, tenant_id);
        assert_eq!(ctx.company_id, None);

        headers.insert(COMPANY_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert_eq!(from_headers(&headers), Err(ContextError::InvalidCompany));
    }
}
