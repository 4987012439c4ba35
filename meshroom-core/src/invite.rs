use crate::model::PeerId;
use thiserror::Error;
use url::Url;

/// Query parameter carrying the host identifier.
pub const ROOM_QUERY_PARAM: &str = "room";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InviteError {
    #[error("'{0}' is neither an invitation link nor a room id")]
    InvalidLink(String),

    #[error("invitation link '{0}' has no room parameter")]
    MissingRoom(String),
}

/// Builds `<base>?room=<host>`, replacing any room parameter already in `base`.
pub fn invite_link(base: &str, host: &PeerId) -> Result<String, InviteError> {
    let mut url = Url::parse(base).map_err(|_| InviteError::InvalidLink(base.to_owned()))?;

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != ROOM_QUERY_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        pairs.append_pair(ROOM_QUERY_PARAM, host.as_str());
    }

    Ok(url.to_string())
}

/// Accepts a full invitation link, a relative one (`/chat?room=..`) or a bare room id.
pub fn parse_invite(input: &str) -> Result<PeerId, InviteError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(InviteError::InvalidLink(input.to_owned()));
    }

    let url = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) if is_relative_link(trimmed) => {
            let base = Url::parse("http://invite.local/")
                .map_err(|_| InviteError::InvalidLink(input.to_owned()))?;
            base.join(trimmed)
                .map_err(|_| InviteError::InvalidLink(input.to_owned()))?
        }
        Err(url::ParseError::RelativeUrlWithoutBase) => return bare_room_id(trimmed),
        Err(_) => return Err(InviteError::InvalidLink(input.to_owned())),
    };

    url.query_pairs()
        .find(|(k, _)| k == ROOM_QUERY_PARAM)
        .map(|(_, v)| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .map(PeerId::from)
        .ok_or_else(|| InviteError::MissingRoom(input.to_owned()))
}

fn is_relative_link(s: &str) -> bool {
    s.starts_with('/') || s.contains('?')
}

fn bare_room_id(s: &str) -> Result<PeerId, InviteError> {
    if s.chars().any(|c| c.is_whitespace() || c == '/' || c == '&' || c == '=') {
        return Err(InviteError::InvalidLink(s.to_owned()));
    }
    Ok(PeerId::from(s))
}
