//! In-process store with the same visible behavior as `PgStore`, used by the handler tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use axum::async_trait;
use time::OffsetDateTime;

use crate::attributes::repo::AttributeRepo;
use crate::attributes::repo_types::{Attribute, AttributeKind};
use crate::auth::repo::UserRepo;
use crate::auth::repo_types::{NewUser, User, UserChanges};
use crate::db::StoreError;
use crate::recipes::repo::RecipeRepo;
use crate::recipes::repo_types::{NewRecipe, Recipe, RecipeChanges, RecipeFilter, RecipeWithLinks};

#[derive(Default)]
struct Inner {
    seq: HashMap<&'static str, i64>,
    users: BTreeMap<i64, User>,
    recipes: BTreeMap<i64, Recipe>,
    attributes: HashMap<AttributeKind, BTreeMap<i64, Attribute>>,
    // (recipe_id, attribute_id)
    links: HashMap<AttributeKind, BTreeSet<(i64, i64)>>,
}

impl Inner {
    fn next_id(&mut self, table: &'static str) -> i64 {
        let id = self.seq.entry(table).or_insert(0);
        *id += 1;
        *id
    }

    fn attrs(&mut self, kind: AttributeKind) -> &mut BTreeMap<i64, Attribute> {
        self.attributes.entry(kind).or_default()
    }

    fn links(&mut self, kind: AttributeKind) -> &mut BTreeSet<(i64, i64)> {
        self.links.entry(kind).or_default()
    }

    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn get_or_create(&mut self, kind: AttributeKind, owner: i64, name: &str) -> i64 {
        let found = self
            .attrs(kind)
            .values()
            .find(|a| a.user_id == owner && a.name == name)
            .map(|a| a.id);
        if let Some(id) = found {
            return id;
        }
        let id = self.next_id(kind.plural());
        self.attrs(kind).insert(
            id,
            Attribute {
                id,
                user_id: owner,
                name: name.to_string(),
            },
        );
        id
    }

    fn attach(&mut self, kind: AttributeKind, owner: i64, recipe_id: i64, names: &[String]) {
        for name in names {
            let attr_id = self.get_or_create(kind, owner, name);
            self.links(kind).insert((recipe_id, attr_id));
        }
    }

    fn clear_links(&mut self, kind: AttributeKind, recipe_id: i64) {
        self.links(kind).retain(|(r, _)| *r != recipe_id);
    }

    fn linked_to(&mut self, kind: AttributeKind, recipe_id: i64) -> Vec<Attribute> {
        let ids: Vec<i64> = self
            .links(kind)
            .iter()
            .filter(|(r, _)| *r == recipe_id)
            .map(|(_, a)| *a)
            .collect();
        let attrs = self.attrs(kind);
        let mut out: Vec<Attribute> = ids.iter().filter_map(|id| attrs.get(id).cloned()).collect();
        out.sort_by_key(|a| a.id);
        out
    }

    fn is_linked(&mut self, kind: AttributeKind, recipe_id: i64, wanted: &[i64]) -> bool {
        wanted.is_empty()
            || self
                .links(kind)
                .iter()
                .any(|(r, a)| *r == recipe_id && wanted.contains(a))
    }

    fn with_links(&mut self, recipe: Recipe) -> RecipeWithLinks {
        let tags = self.linked_to(AttributeKind::Tag, recipe.id);
        let ingredients = self.linked_to(AttributeKind::Ingredient, recipe.id);
        RecipeWithLinks {
            recipe,
            tags,
            ingredients,
        }
    }

    fn owned_recipe(&self, owner: i64, id: i64) -> Option<Recipe> {
        self.recipes
            .get(&id)
            .filter(|r| r.user_id == owner)
            .cloned()
    }

    fn drop_recipe(&mut self, id: i64) -> Option<Recipe> {
        let removed = self.recipes.remove(&id)?;
        for kind in [AttributeKind::Tag, AttributeKind::Ingredient] {
            self.clear_links(kind, id);
        }
        Some(removed)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

const EMAIL_TAKEN: &str = "user with this email already exists";

#[async_trait]
impl UserRepo for MemoryStore {
    async fn insert_user(&self, new: NewUser) -> Result<User, StoreError> {
        let mut db = self.lock();
        if db.email_taken(&new.email, None) {
            return Err(StoreError::Conflict(EMAIL_TAKEN.into()));
        }
        let id = db.next_id("users");
        let user = User {
            id,
            email: new.email,
            name: new.name,
            password_hash: new.password_hash,
            is_active: new.is_active,
            is_staff: new.is_staff,
            is_superuser: new.is_superuser,
            last_login: None,
            created_at: OffsetDateTime::now_utc(),
        };
        db.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.lock().users.values().cloned().collect())
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<Option<User>, StoreError> {
        let mut db = self.lock();
        if let Some(email) = &changes.email {
            if db.email_taken(email, Some(id)) {
                return Err(StoreError::Conflict(EMAIL_TAKEN.into()));
            }
        }
        let Some(user) = db.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = changes.email {
            user.email = v;
        }
        if let Some(v) = changes.name {
            user.name = v;
        }
        if let Some(v) = changes.password_hash {
            user.password_hash = v;
        }
        if let Some(v) = changes.is_active {
            user.is_active = v;
        }
        if let Some(v) = changes.is_staff {
            user.is_staff = v;
        }
        if let Some(v) = changes.is_superuser {
            user.is_superuser = v;
        }
        Ok(Some(user.clone()))
    }

    async fn record_login(&self, id: i64) -> Result<(), StoreError> {
        if let Some(user) = self.lock().users.get_mut(&id) {
            user.last_login = Some(OffsetDateTime::now_utc());
        }
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> Result<bool, StoreError> {
        let mut db = self.lock();
        if db.users.remove(&id).is_none() {
            return Ok(false);
        }
        let owned: Vec<i64> = db
            .recipes
            .values()
            .filter(|r| r.user_id == id)
            .map(|r| r.id)
            .collect();
        for recipe_id in owned {
            db.drop_recipe(recipe_id);
        }
        for kind in [AttributeKind::Tag, AttributeKind::Ingredient] {
            let gone: Vec<i64> = db
                .attrs(kind)
                .values()
                .filter(|a| a.user_id == id)
                .map(|a| a.id)
                .collect();
            db.attrs(kind).retain(|_, a| a.user_id != id);
            db.links(kind).retain(|(_, a)| !gone.contains(a));
        }
        Ok(true)
    }
}

#[async_trait]
impl AttributeRepo for MemoryStore {
    async fn list_attributes(
        &self,
        kind: AttributeKind,
        owner: i64,
        assigned_only: bool,
    ) -> Result<Vec<Attribute>, StoreError> {
        let mut db = self.lock();
        let linked: BTreeSet<i64> = db.links(kind).iter().map(|(_, a)| *a).collect();
        let mut rows: Vec<Attribute> = db
            .attrs(kind)
            .values()
            .filter(|a| a.user_id == owner)
            .filter(|a| !assigned_only || linked.contains(&a.id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.name.cmp(&a.name).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn get_attribute(
        &self,
        kind: AttributeKind,
        owner: i64,
        id: i64,
    ) -> Result<Option<Attribute>, StoreError> {
        Ok(self
            .lock()
            .attrs(kind)
            .get(&id)
            .filter(|a| a.user_id == owner)
            .cloned())
    }

    async fn create_attribute(
        &self,
        kind: AttributeKind,
        owner: i64,
        name: &str,
    ) -> Result<Attribute, StoreError> {
        let mut db = self.lock();
        let id = db.next_id(kind.plural());
        let row = Attribute {
            id,
            user_id: owner,
            name: name.to_string(),
        };
        db.attrs(kind).insert(id, row.clone());
        Ok(row)
    }

    async fn rename_attribute(
        &self,
        kind: AttributeKind,
        owner: i64,
        id: i64,
        name: &str,
    ) -> Result<Option<Attribute>, StoreError> {
        let mut db = self.lock();
        match db.attrs(kind).get_mut(&id) {
            Some(a) if a.user_id == owner => {
                a.name = name.to_string();
                Ok(Some(a.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_attribute(
        &self,
        kind: AttributeKind,
        owner: i64,
        id: i64,
    ) -> Result<bool, StoreError> {
        let mut db = self.lock();
        let owned = db.attrs(kind).get(&id).is_some_and(|a| a.user_id == owner);
        if !owned {
            return Ok(false);
        }
        db.attrs(kind).remove(&id);
        db.links(kind).retain(|(_, a)| *a != id);
        Ok(true)
    }
}

#[async_trait]
impl RecipeRepo for MemoryStore {
    async fn list_recipes(&self, owner: i64, filter: &RecipeFilter) -> Result<Vec<Recipe>, StoreError> {
        let mut db = self.lock();
        let candidates: Vec<Recipe> = db
            .recipes
            .values()
            .rev()
            .filter(|r| r.user_id == owner)
            .cloned()
            .collect();
        Ok(candidates
            .into_iter()
            .filter(|r| {
                db.is_linked(AttributeKind::Tag, r.id, &filter.tag_ids)
                    && db.is_linked(AttributeKind::Ingredient, r.id, &filter.ingredient_ids)
            })
            .collect())
    }

    async fn get_recipe(&self, owner: i64, id: i64) -> Result<Option<RecipeWithLinks>, StoreError> {
        let mut db = self.lock();
        Ok(db.owned_recipe(owner, id).map(|r| db.with_links(r)))
    }

    async fn create_recipe(&self, owner: i64, new: NewRecipe) -> Result<RecipeWithLinks, StoreError> {
        let mut db = self.lock();
        let id = db.next_id("recipes");
        let recipe = Recipe {
            id,
            user_id: owner,
            title: new.title,
            description: new.description,
            time_minutes: new.time_minutes,
            price: new.price,
            link: new.link,
            image: None,
            created_at: OffsetDateTime::now_utc(),
        };
        db.recipes.insert(id, recipe.clone());
        db.attach(AttributeKind::Tag, owner, id, &new.tags);
        db.attach(AttributeKind::Ingredient, owner, id, &new.ingredients);
        Ok(db.with_links(recipe))
    }

    async fn update_recipe(
        &self,
        owner: i64,
        id: i64,
        changes: RecipeChanges,
    ) -> Result<Option<RecipeWithLinks>, StoreError> {
        let mut db = self.lock();
        let Some(mut recipe) = db.owned_recipe(owner, id) else {
            return Ok(None);
        };
        if let Some(v) = changes.title {
            recipe.title = v;
        }
        if let Some(v) = changes.description {
            recipe.description = v;
        }
        if let Some(v) = changes.time_minutes {
            recipe.time_minutes = v;
        }
        if let Some(v) = changes.price {
            recipe.price = v;
        }
        if let Some(v) = changes.link {
            recipe.link = v;
        }
        db.recipes.insert(id, recipe.clone());

        if let Some(tags) = &changes.tags {
            db.clear_links(AttributeKind::Tag, id);
            db.attach(AttributeKind::Tag, owner, id, tags);
        }
        if let Some(ingredients) = &changes.ingredients {
            db.clear_links(AttributeKind::Ingredient, id);
            db.attach(AttributeKind::Ingredient, owner, id, ingredients);
        }
        Ok(Some(db.with_links(recipe)))
    }

    async fn set_recipe_image(
        &self,
        owner: i64,
        id: i64,
        image: &str,
    ) -> Result<Option<Recipe>, StoreError> {
        let mut db = self.lock();
        match db.recipes.get_mut(&id) {
            Some(r) if r.user_id == owner => {
                r.image = Some(image.to_string());
                Ok(Some(r.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_recipe(&self, owner: i64, id: i64) -> Result<Option<Recipe>, StoreError> {
        let mut db = self.lock();
        if db.owned_recipe(owner, id).is_none() {
            return Ok(None);
        }
        Ok(db.drop_recipe(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            name: String::new(),
            password_hash: "!".into(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
        }
    }

    fn recipe(title: &str, tags: &[&str]) -> NewRecipe {
        NewRecipe {
            title: title.into(),
            description: String::new(),
            time_minutes: 5,
            price: Decimal::new(100, 2),
            link: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ingredients: vec![],
        }
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = MemoryStore::default();
        store.insert_user(new_user("a@example.com")).await.unwrap();
        let err = store.insert_user(new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn delete_user_cascades() {
        let store = MemoryStore::default();
        let user = store.insert_user(new_user("a@example.com")).await.unwrap();
        let other = store.insert_user(new_user("b@example.com")).await.unwrap();
        store.create_recipe(user.id, recipe("Tea", &["Hot"])).await.unwrap();
        store.create_recipe(other.id, recipe("Cake", &["Sweet"])).await.unwrap();

        assert!(store.delete_user(user.id).await.unwrap());
        assert!(store.list_recipes(user.id, &RecipeFilter::default()).await.unwrap().is_empty());
        assert!(store.list_attributes(AttributeKind::Tag, user.id, false).await.unwrap().is_empty());
        assert_eq!(store.list_recipes(other.id, &RecipeFilter::default()).await.unwrap().len(), 1);
        assert!(!store.delete_user(user.id).await.unwrap());
    }

    #[tokio::test]
    async fn names_are_reused_per_owner() {
        let store = MemoryStore::default();
        let r1 = store.create_recipe(1, recipe("One", &["Vegan", "Vegan"])).await.unwrap();
        let r2 = store.create_recipe(1, recipe("Two", &["Vegan"])).await.unwrap();
        let r3 = store.create_recipe(2, recipe("Three", &["Vegan"])).await.unwrap();
        assert_eq!(r1.tags.len(), 1);
        assert_eq!(r1.tags[0].id, r2.tags[0].id);
        assert_ne!(r1.tags[0].id, r3.tags[0].id);
    }
}
