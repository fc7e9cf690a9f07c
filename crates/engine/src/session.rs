use std::collections::BTreeSet;

use rosterdesk_core::{CoreError, EditorId, RowId, SessionId};

use crate::overlay::MergedView;

/// Who is editing and which organizational unit they may touch. Supplied by
/// the identity provider and trusted as given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub editor: EditorId,
    pub partition: String,
}

impl SessionIdentity {
    pub fn new(editor: &str, partition: &str) -> Result<Self, CoreError> {
        if partition.is_empty() {
            return Err(CoreError::InvalidData("partition is blank".into()));
        }
        Ok(Self {
            editor: EditorId::new(editor)?,
            partition: partition.to_string(),
        })
    }
}

/// One edit: the view as it was displayed, kept as the baseline for the diff
/// at save time. Later saves by other sessions do not touch it.
#[derive(Debug, Clone)]
pub struct EditSession {
    id: SessionId,
    identity: SessionIdentity,
    displayed: MergedView,
}

impl EditSession {
    pub(crate) fn new(id: SessionId, identity: SessionIdentity, displayed: MergedView) -> Self {
        Self {
            id,
            identity,
            displayed,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    pub fn displayed(&self) -> &MergedView {
        &self.displayed
    }

    /// A copy of the displayed view for the presentation layer to edit.
    pub fn working_copy(&self) -> MergedView {
        self.displayed.clone()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub changed: BTreeSet<RowId>,
    pub persisted: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_rejects_blank_values() {
        assert!(SessionIdentity::new("jdiaz", "").is_err());
        assert!(SessionIdentity::new(" ", "SAF-10").is_err());
        let identity = SessionIdentity::new("jdiaz", "SAF-10").unwrap();
        assert_eq!(identity.editor.as_str(), "jdiaz");
    }
}
