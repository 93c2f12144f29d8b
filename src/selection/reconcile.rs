//! Keeps the selection consistent with the properties the user can actually see.

use anyhow::Result;
use tracing::debug;

use super::{Role, SelectionStore};
use crate::api::Property;

/// Properties offered by the property selector for the current landlord
pub fn property_options<'a>(properties: &'a [Property], landlord_id: Option<&str>) -> Vec<&'a Property> {
    properties
        .iter()
        .filter(|p| match landlord_id {
            Some(landlord) => p.landlord_id.as_deref() == Some(landlord),
            None => true,
        })
        .collect()
}

/// Reconcile the selection with the visible property list.
///
/// - a selected property owned by another landlord pulls that landlord in
///   (which, by the cascade rule, resets the property)
/// - a landlord with a single property gets it selected; with several, a
///   property that is not theirs is dropped
/// - clients always work inside a property, defaulting to the first one
///
/// Returns `true` if the selection changed.
pub fn reconcile(store: &mut SelectionStore, role: Role, properties: &[Property]) -> Result<bool> {
    let before = store.selection().clone();

    if let Some(selected) = store.property_id().map(str::to_string) {
        let owner = properties
            .iter()
            .find(|p| p.id == selected)
            .and_then(|p| p.landlord_id.clone());
        if let Some(owner) = owner {
            if store.landlord_id() != Some(owner.as_str()) {
                debug!("Property {} belongs to landlord {}, adopting owner", selected, owner);
                store.set_landlord_id(Some(&owner))?;
            }
        }
    }

    if let Some(landlord) = store.landlord_id().map(str::to_string) {
        let owned = property_options(properties, Some(&landlord));
        match owned.as_slice() {
            [only] => {
                if store.property_id() != Some(only.id.as_str()) {
                    let id = only.id.clone();
                    store.set_property_id(Some(&id))?;
                }
            }
            [] => {}
            _ => {
                let stray = store
                    .property_id()
                    .is_some_and(|selected| !owned.iter().any(|p| p.id == selected));
                if stray {
                    store.set_property_id(None)?;
                }
            }
        }
    }

    if role.is_client() && store.property_id().is_none() {
        if let Some(first) = properties.first() {
            let id = first.id.clone();
            store.set_property_id(Some(&id))?;
        }
    }

    Ok(store.selection() != &before)
}
