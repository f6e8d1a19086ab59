// URL assembly for the server transport:
// BASE/v1/sync/{workspace_id}?token={auth}&userId={participant}&sync_mode={mode}

use nmeshed_base::{ParticipantId, WorkspaceId};

pub fn build_sync_url(
    base: &str,
    workspace: &WorkspaceId,
    token: &str,
    participant: &ParticipantId,
    sync_mode: &str,
) -> String {
    let base = base.trim_end_matches('/');
    format!(
        "{base}/v1/sync/{}?token={}&userId={}&sync_mode={sync_mode}",
        workspace.to_hex(),
        urlencode(token),
        urlencode(participant.as_str()),
    )
}

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}
