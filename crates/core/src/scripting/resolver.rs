//! Resolves an id-or-name reference to exactly one stored script.

use crate::error::CoreError;
use crate::script::{ScriptRecord, ScriptRef};
use crate::store::ScriptStore;

/// Fetch the script a caller refers to. The id wins when both are given.
///
/// Read-only. Fails with [`CoreError::NotFound`] when nothing matches
/// (including ids that are not well-formed), [`CoreError::Validation`] when
/// the reference is empty, and passes store failures through.
pub async fn resolve(
    store: &dyn ScriptStore,
    reference: &ScriptRef,
) -> Result<ScriptRecord, CoreError> {
    let not_found = || CoreError::NotFound {
        reference: reference.to_string(),
    };

    let Some(lookup) = reference.preferring_id()? else {
        return Err(not_found());
    };

    store.find_one(&lookup).await?.ok_or_else(not_found)
}
