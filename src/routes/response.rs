use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SuccessResponse<'a> {
    Healthz {
        name: &'a str,
        revision: Option<&'a str>,
        timestamp: Option<&'a str>,
        version: &'a str,
        store: &'a str,
    },
    Status {
        message: &'a str,
    },
}
