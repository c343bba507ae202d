use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::{CrudError, CrudResult};
use crate::item::{FieldValue, Item, ItemId};

#[derive(Default)]
struct StoreState {
    resources: HashMap<String, Vec<Item>>,
    next_id: i64,
}

/// In-memory collections of items keyed by resource path.
///
/// Backs both `InMemoryTransport` and the development HTTP server. Items are
/// stored verbatim; the only field the store ever writes is `id`.
#[derive(Clone, Default)]
pub struct ResourceStore {
    state: Arc<Mutex<StoreState>>,
}

/// Canonical resource key: no leading/trailing slashes.
pub fn resource_key(path: &str) -> String {
    path.trim().trim_matches('/').to_string()
}

/// Splits `products/7` into (`products`, `7`).
pub fn split_member_path(path: &str) -> CrudResult<(String, ItemId)> {
    let key = resource_key(path);
    match key.rsplit_once('/') {
        Some((resource, id)) if !resource.is_empty() && !id.is_empty() => {
            Ok((resource.to_string(), ItemId::from(id)))
        }
        _ => Err(CrudError::NotFound(format!("/{key}"))),
    }
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replaces a collection wholesale. Numeric ids bump the id counter.
    pub fn seed(&self, resource: &str, items: Vec<Item>) {
        let mut state = self.state();
        for item in &items {
            if let Some(FieldValue::Number(n)) = item.get(Item::ID_KEY) {
                if let Some(n) = n.as_i64() {
                    state.next_id = state.next_id.max(n);
                }
            }
        }
        state.resources.insert(resource_key(resource), items);
    }

    pub fn list(&self, resource: &str) -> Vec<Item> {
        self.state()
            .resources
            .get(&resource_key(resource))
            .cloned()
            .unwrap_or_default()
    }

    /// Stores a new item. A missing id is generated; a supplied id must be
    /// unique within the collection and raises the id counter when numeric.
    pub fn create(&self, resource: &str, mut item: Item) -> CrudResult<Item> {
        let key = resource_key(resource);
        let mut state = self.state();
        match item.id() {
            Some(id) => {
                let taken = state
                    .resources
                    .get(&key)
                    .is_some_and(|items| items.iter().any(|i| i.id().as_ref() == Some(&id)));
                if taken {
                    return Err(CrudError::Conflict(format!("/{key}/{id}")));
                }
                if let Some(FieldValue::Number(n)) = item.get(Item::ID_KEY) {
                    if let Some(n) = n.as_i64() {
                        state.next_id = state.next_id.max(n);
                    }
                }
            }
            None => {
                state.next_id += 1;
                let id = state.next_id;
                item.set(Item::ID_KEY, id);
            }
        }
        state.resources.entry(key).or_default().push(item.clone());
        Ok(item)
    }

    pub fn update(&self, resource: &str, id: &ItemId, mut item: Item) -> CrudResult<Item> {
        let key = resource_key(resource);
        let mut state = self.state();
        let slot = state
            .resources
            .get_mut(&key)
            .and_then(|items| items.iter_mut().find(|i| i.id().as_ref() == Some(id)))
            .ok_or_else(|| CrudError::NotFound(format!("/{key}/{id}")))?;
        let keep = slot.get(Item::ID_KEY).cloned().unwrap_or(FieldValue::Null);
        item.set(Item::ID_KEY, keep);
        *slot = item.clone();
        Ok(item)
    }

    pub fn delete(&self, resource: &str, id: &ItemId) -> CrudResult<()> {
        let key = resource_key(resource);
        let mut state = self.state();
        let items = state
            .resources
            .get_mut(&key)
            .ok_or_else(|| CrudError::NotFound(format!("/{key}/{id}")))?;
        let before = items.len();
        items.retain(|i| i.id().as_ref() != Some(id));
        if items.len() == before {
            return Err(CrudError::NotFound(format!("/{key}/{id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_assigns_ids_after_seeded_ones() {
        let store = ResourceStore::new();
        store.seed("/products", vec![Item::new().with("id", 4).with("sku", "A1")]);
        let created = store.create("products", Item::new().with("sku", "C3")).unwrap();
        assert_eq!(created.id(), Some(ItemId::from(5)));
        assert_eq!(store.list("products/").len(), 2);
    }

    #[test]
    fn update_keeps_stored_id_when_body_has_none() {
        let store = ResourceStore::new();
        store.seed("products", vec![Item::new().with("id", 1).with("sku", "A1")]);
        let updated = store
            .update("products", &ItemId::from(1), Item::new().with("sku", "B2"))
            .unwrap();
        assert_eq!(updated.id(), Some(ItemId::from(1)));
        assert_eq!(store.list("products")[0].display("sku"), "B2");
    }

    #[test]
    fn supplied_ids_are_never_handed_out_again() {
        let store = ResourceStore::new();
        store.create("products", Item::new().with("id", 1)).unwrap();
        let generated = store.create("products", Item::new()).unwrap();
        assert_eq!(generated.id(), Some(ItemId::from(2)));

        let duplicate = store.create("products", Item::new().with("id", 2));
        assert!(matches!(duplicate, Err(CrudError::Conflict(_))));

        store.delete("products", &ItemId::from(1)).unwrap();
        assert_eq!(store.list("products").len(), 1);
    }

    #[test]
    fn update_cannot_change_identity() {
        let store = ResourceStore::new();
        store.seed(
            "products",
            vec![Item::new().with("id", 1), Item::new().with("id", 2)],
        );
        let updated = store
            .update(
                "products",
                &ItemId::from(1),
                Item::new().with("id", 2).with("sku", "X"),
            )
            .unwrap();
        assert_eq!(updated.id(), Some(ItemId::from(1)));

        store.delete("products", &ItemId::from(2)).unwrap();
        let left = store.list("products");
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].display("sku"), "X");
    }

    #[test]
    fn delete_missing_item_is_not_found() {
        let store = ResourceStore::new();
        store.seed("products", vec![Item::new().with("id", 1)]);
        assert!(matches!(
            store.delete("products", &ItemId::from(2)),
            Err(CrudError::NotFound(_))
        ));
        store.delete("products", &ItemId::from(1)).unwrap();
        assert!(store.list("products").is_empty());
    }

    #[test]
    fn member_paths_split_on_last_segment() {
        let (resource, id) = split_member_path("/admin/products/7").unwrap();
        assert_eq!(resource, "admin/products");
        assert_eq!(id, ItemId::from(7));
        assert!(split_member_path("/products").is_err());
    }
}
