// ============================================================================
// src/executor/changeset.rs - Changeset application
// ============================================================================
//
// Applies inserts, then updates, then deletes, each list in order. Items are
// independent store calls: there is no transaction around the batch, so the
// first failure stops processing and leaves earlier items applied.
//
// ============================================================================

use super::condition::normalize;
use crate::connection::Connection;
use crate::core::{Condition, ID_FIELD, Result, condition_identifier, merge_documents};
use crate::protocol::{ChangeResult, ChangeSet, ChangeSummary, DeleteOp, InsertOp, UpdateOp};
use crate::storage::DocumentStore;
use log::{debug, warn};
use mongodb::bson::{Bson, Document, doc};

/// Apply a changeset, reporting affected identifiers per category
///
/// Returns [`ChangeResult::Failed`] on the first failing item. Items applied
/// before the failure are not rolled back and are not listed in the result.
pub async fn apply_changeset(conn: &Connection, change_set: &ChangeSet) -> ChangeResult {
    debug!(
        "Applying changeset: {} inserts, {} updates, {} deletes",
        change_set.inserts.len(),
        change_set.updates.len(),
        change_set.deletes.len()
    );

    match apply_all(conn.store(), change_set).await {
        Ok(summary) => {
            debug!("Changeset applied, {} items reported", summary.total());
            ChangeResult::Applied(summary)
        }
        Err(err) => {
            warn!("Changeset aborted: {}", err);
            ChangeResult::failed(&err)
        }
    }
}

async fn apply_all(store: &dyn DocumentStore, change_set: &ChangeSet) -> Result<ChangeSummary> {
    let mut summary = ChangeSummary::default();

    for insert in &change_set.inserts {
        summary.inserted.push(apply_insert(store, insert).await?);
    }

    for update in &change_set.updates {
        if update.is_replace() {
            if let Some(id) = apply_replace(store, update).await? {
                summary.replaced.push(id);
            }
        } else if let Some(id) = apply_partial_update(store, update).await? {
            summary.updated.push(id);
        }
    }

    for delete in &change_set.deletes {
        if let Some(id) = apply_delete(store, delete).await? {
            summary.deleted.push(id);
        }
    }

    Ok(summary)
}

async fn apply_insert(store: &dyn DocumentStore, op: &InsertOp) -> Result<Bson> {
    let document = merge_documents(op.document.as_ref(), op.fields.as_ref());
    store
        .insert_one(&op.pure_name, document)
        .await
        .map_err(|e| e.into_changeset())
}

/// Replace path: look the target up, then overwrite it keeping its `_id`
///
/// A condition matching nothing is skipped without error.
async fn apply_replace(store: &dyn DocumentStore, op: &UpdateOp) -> Result<Option<Bson>> {
    let filter = normalize(op.condition.clone());
    let Some(target) = store
        .find_one(&op.pure_name, filter)
        .await
        .map_err(|e| e.into_changeset())?
    else {
        debug!("Replace in '{}' matched nothing, skipped", op.pure_name);
        return Ok(None);
    };

    let id = target.get(ID_FIELD).cloned().unwrap_or(Bson::Null);
    let merged = merge_documents(op.document.as_ref(), op.fields.as_ref());

    let mut replacement = Document::new();
    replacement.insert(ID_FIELD, id.clone());
    for (key, value) in merged {
        if key != ID_FIELD {
            replacement.insert(key, value);
        }
    }

    // Target the document that was read, not whatever the condition matches now
    store
        .replace_one(&op.pure_name, doc! { "_id": id.clone() }, replacement)
        .await
        .map_err(|e| e.into_changeset())?;

    Ok(Some(id))
}

/// Partial path: `$set` the fields on the first match without reading it
///
/// The reported identifier comes from the condition, see
/// [`reported_identifier`]. Updates with no fields are skipped.
async fn apply_partial_update(store: &dyn DocumentStore, op: &UpdateOp) -> Result<Option<Bson>> {
    let fields = match &op.fields {
        Some(fields) if !fields.is_empty() => fields.clone(),
        _ => {
            debug!("Update in '{}' has no fields, skipped", op.pure_name);
            return Ok(None);
        }
    };

    let filter = normalize(op.condition.clone());
    let reported = reported_identifier(&filter);
    let outcome = store
        .update_one(&op.pure_name, filter, doc! { "$set": fields })
        .await
        .map_err(|e| e.into_changeset())?;

    Ok((outcome.matched > 0).then_some(reported))
}

async fn apply_delete(store: &dyn DocumentStore, op: &DeleteOp) -> Result<Option<Bson>> {
    let filter = normalize(op.condition.clone());
    let reported = reported_identifier(&filter);
    let deleted = store
        .delete_one(&op.pure_name, filter)
        .await
        .map_err(|e| e.into_changeset())?;

    Ok((deleted > 0).then_some(reported))
}

/// Identifier reported for updates and deletes
///
/// The store does not say which document an `update_one`/`delete_one` hit, so
/// this is the `_id` the (normalized) condition names, or `null` when the
/// condition selects by other fields.
pub fn reported_identifier(condition: &Condition) -> Bson {
    condition_identifier(condition).cloned().unwrap_or(Bson::Null)
}
