use crate::datastore::{columns, Table};
use crate::types::{Role, UserRecord};

/// Roster lookup, case-insensitive on the email
pub fn find_user_by_email(users: &Table, email: &str) -> Option<UserRecord> {
    let wanted = email.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }

    users.rows().find_map(|row| {
        let stored = row.text(columns::EMAIL)?;
        if stored.trim().to_lowercase() != wanted {
            return None;
        }
        let role = row
            .text(columns::ROLE)
            .map(|r| Role::from_roster(&r))
            .unwrap_or(Role::Member);
        Some(UserRecord {
            email: stored.trim().to_string(),
            role,
        })
    })
}

/// Display name under which `email`'s submissions are filed.
///
/// An explicit `Name` column on the roster wins. Otherwise the first
/// submission whose `Name` contains the email's local part (ignoring case)
/// supplies it.
pub fn resolve_attributed_name(users: &Table, submissions: &Table, email: &str) -> Option<String> {
    let wanted = email.trim().to_lowercase();

    let roster_name = users.rows().find_map(|row| {
        let stored = row.text(columns::EMAIL)?;
        if stored.trim().to_lowercase() != wanted {
            return None;
        }
        row.text(columns::NAME).map(|n| n.trim().to_string())
    });
    if roster_name.is_some() {
        return roster_name;
    }

    let local_part = wanted.split('@').next().unwrap_or("").trim();
    if local_part.is_empty() {
        return None;
    }

    submissions.rows().find_map(|row| {
        let name = row.text(columns::NAME)?;
        name.to_lowercase()
            .contains(local_part)
            .then(|| name.into_owned())
    })
}
