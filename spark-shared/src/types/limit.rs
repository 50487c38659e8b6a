use serde::Deserialize;

/// `?limit=` query parameter shared by list endpoints.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<u32>,
}

impl LimitParams {
    /// Resolve the requested limit against an endpoint's default and cap.
    /// Zero is treated as "not supplied".
    pub fn resolve(&self, default: u32, max: u32) -> u32 {
        match self.limit {
            Some(0) | None => default.min(max),
            Some(n) => n.min(max),
        }
    }
}
