use serde::Serialize;

/// Acknowledgement returned to the execution backend.
#[derive(Serialize, utoipa::ToSchema)]
pub struct CallbackAck {
    /// `processed` when the result was folded, `ignored` otherwise.
    #[schema(example = "processed")]
    pub status: &'static str,
}

impl CallbackAck {
    pub const PROCESSED: Self = Self {
        status: "processed",
    };
    pub const IGNORED: Self = Self { status: "ignored" };
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: &'static str,
    pub version: &'static str,
}
