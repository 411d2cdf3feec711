use crate::error::CallError;
use std::collections::HashMap;
use std::fmt;

pub const ACCESS_TOKEN_ATTRIBUTE: &str = "accessToken";
pub const AGENT_ID_ATTRIBUTE: &str = "agentId";

/// Caller-provided credentials needed by the backend
#[derive(Clone, PartialEq, Eq)]
pub struct CallerCredentials {
    pub access_token: String,
    pub agent_id: u64,
}

impl CallerCredentials {
    pub fn from_attributes(attributes: &HashMap<String, String>) -> Result<Self, CallError> {
        let access_token = attributes
            .get(ACCESS_TOKEN_ATTRIBUTE)
            .filter(|token| !token.is_empty())
            .ok_or(CallError::MissingAttribute(ACCESS_TOKEN_ATTRIBUTE))?
            .clone();

        let raw_agent_id = attributes
            .get(AGENT_ID_ATTRIBUTE)
            .filter(|id| !id.is_empty())
            .ok_or(CallError::MissingAttribute(AGENT_ID_ATTRIBUTE))?;

        let agent_id = raw_agent_id
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| CallError::InvalidAttribute {
                name: AGENT_ID_ATTRIBUTE,
                value: raw_agent_id.clone(),
            })?;

        Ok(Self {
            access_token,
            agent_id,
        })
    }
}

impl fmt::Debug for CallerCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallerCredentials")
            .field("access_token", &"[REDACTED]")
            .field("agent_id", &self.agent_id)
            .finish()
    }
}
