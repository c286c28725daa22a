use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct NewTenantBodyDto {
    pub tenant_id: String,
}
