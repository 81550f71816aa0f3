//! Badge lifecycle decisions for the verification toggle.
//!
//! [`reconcile`] looks only at the request and the event's current badge and
//! returns a [`BadgePlan`]. Running the plan (upload, commit, cleanup) is the
//! caller's job, see `services::verification`.

/// An uploaded badge image, already validated by the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BadgePlan {
    /// Verification removed. `stale` is the custom badge to delete after commit.
    Remove { stale: Option<String> },
    /// Still verified without a new image; keep pointing at `badge`.
    Retain { badge: String },
    /// Store `upload` first. `previous` is the custom badge it may supersede.
    Replace {
        upload: BadgeUpload,
        previous: Option<String>,
    },
}

pub fn reconcile(
    requested_verified: bool,
    upload: Option<BadgeUpload>,
    previous: Option<&str>,
    default_badge: &str,
) -> BadgePlan {
    let custom = previous.filter(|badge| !badge.is_empty() && *badge != default_badge);

    match (requested_verified, upload) {
        (false, _) => BadgePlan::Remove {
            stale: custom.map(str::to_string),
        },
        (true, Some(upload)) => BadgePlan::Replace {
            upload,
            previous: custom.map(str::to_string),
        },
        (true, None) => BadgePlan::Retain {
            badge: previous
                .filter(|badge| !badge.is_empty())
                .unwrap_or(default_badge)
                .to_string(),
        },
    }
}

/// The badge to delete once `stored` has replaced `previous` in the record.
pub fn superseded(previous: Option<String>, stored: &str) -> Option<String> {
    previous.filter(|badge| badge != stored)
}
