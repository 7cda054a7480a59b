use anyhow::Result;
use libsql::Connection;
use serde::{Deserialize, Serialize};

use crate::page::Page;

/// Fields a bookmark list may be ordered by.
pub const SORTABLE_FIELDS: &[&str] = &["id", "title", "created_at", "url"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: i32,
    pub url: String,
    pub title: String,
    pub comment: Option<String>,
    pub folder_id: Option<i32>,
    #[serde(rename = "faviconColor")]
    pub favicon_color: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Folder {
    pub id: i32,
    pub name: String,
    pub parent_id: Option<i32>,
    pub color: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookmark {
    pub url: String,
    pub title: Option<String>,
    pub comment: Option<String>,
    pub folder_id: Option<i32>,
    #[serde(rename = "faviconColor")]
    pub favicon_color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBookmark {
    pub url: Option<String>,
    pub title: Option<String>,
    pub comment: Option<String>,
    // double Option: absent field vs explicit null (move back to root)
    #[serde(default, with = "serde_double_option")]
    pub folder_id: Option<Option<i32>>,
    #[serde(rename = "faviconColor")]
    pub favicon_color: Option<String>,
}

impl UpdateBookmark {
    pub fn is_empty(&self) -> bool {
        self.url.is_none()
            && self.title.is_none()
            && self.comment.is_none()
            && self.folder_id.is_none()
            && self.favicon_color.is_none()
    }

    /// `url` is required at create and stays required; a partial update may
    /// not blank it.
    pub fn blanks_required_field(&self) -> bool {
        self.url.as_deref() == Some("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFolder {
    pub name: String,
    pub parent_id: Option<i32>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFolder {
    pub name: Option<String>,
    #[serde(default, with = "serde_double_option")]
    pub parent_id: Option<Option<i32>>,
    pub color: Option<String>,
}

impl UpdateFolder {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.parent_id.is_none() && self.color.is_none()
    }

    /// `name` is required at create and stays required; a partial update may
    /// not blank it.
    pub fn blanks_required_field(&self) -> bool {
        self.name.as_deref() == Some("")
    }
}

/// Distinguishes a missing JSON field (outer None) from an explicit null
/// (inner None) when deserializing partial updates.
mod serde_double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn deserialize<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(de).map(Some)
    }

    pub fn serialize<S, T>(value: &Option<Option<T>>, ser: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(inner) => inner.serialize(ser),
            None => ser.serialize_none(),
        }
    }
}

/// Ordering spec for the bookmark list: a whitelisted field name, optionally
/// prefixed with `-` for descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: &'static str,
    pub descending: bool,
}

impl Default for SortSpec {
    fn default() -> Self {
        SortSpec {
            field: "created_at",
            descending: true,
        }
    }
}

impl SortSpec {
    pub fn parse(spec: &str) -> Option<Self> {
        let descending = spec.starts_with('-');
        let field = spec.trim_start_matches('-');
        SORTABLE_FIELDS
            .iter()
            .find(|f| **f == field)
            .map(|f| SortSpec {
                field: f,
                descending,
            })
    }

    fn as_sql(&self) -> String {
        let dir = if self.descending { "DESC" } else { "ASC" };
        format!("{} {}", self.field, dir)
    }
}

/// Filters composed into the bookmark list query.
#[derive(Debug, Clone, Default)]
pub struct BookmarkQuery {
    pub folder_id: Option<i32>,
    pub search: Option<String>,
    pub sort: SortSpec,
}

const BOOKMARK_COLUMNS: &str =
    "id, url, title, comment, folder_id, favicon_color, created_at, updated_at";
const FOLDER_COLUMNS: &str = "id, name, parent_id, color, created_at, updated_at";

pub struct Catalog<'a> {
    conn: &'a Connection,
}

impl<'a> Catalog<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn bookmark_predicates(query: &BookmarkQuery) -> (String, Vec<libsql::Value>) {
        let mut conditions: Vec<&str> = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(folder_id) = query.folder_id {
            conditions.push("folder_id = ?");
            params.push(folder_id.into());
        }
        if let Some(search) = query.search.as_deref() {
            if !search.is_empty() {
                // LIKE is case-insensitive for ASCII in SQLite
                conditions.push("title LIKE ?");
                params.push(format!("%{}%", search).into());
            }
        }

        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        (clause, params)
    }

    /// One page of bookmarks plus the exact total under the same predicates.
    pub async fn list_bookmarks(
        &self,
        query: &BookmarkQuery,
        page: &Page,
    ) -> Result<(Vec<Bookmark>, u64)> {
        let (clause, params) = Self::bookmark_predicates(query);

        let count_sql = format!("SELECT COUNT(*) FROM bookmarks{}", clause);
        let mut rows = self.conn.query(&count_sql, params.clone()).await?;
        let total: u64 = match rows.next().await? {
            Some(row) => row.get::<i64>(0)? as u64,
            None => 0,
        };

        let list_sql = format!(
            "SELECT {} FROM bookmarks{} ORDER BY {} LIMIT ? OFFSET ?",
            BOOKMARK_COLUMNS,
            clause,
            query.sort.as_sql()
        );
        let mut params = params;
        params.push(i64::from(page.limit()).into());
        params.push((page.offset() as i64).into());

        let mut rows = self.conn.query(&list_sql, params).await?;
        let mut bookmarks = Vec::new();
        while let Some(row) = rows.next().await? {
            bookmarks.push(Self::row_to_bookmark(&row)?);
        }

        Ok((bookmarks, total))
    }

    pub async fn get_bookmark(&self, id: i32) -> Result<Option<Bookmark>> {
        let sql = format!("SELECT {} FROM bookmarks WHERE id = ?", BOOKMARK_COLUMNS);
        let mut rows = self.conn.query(&sql, libsql::params![id]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_bookmark(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn create_bookmark(&self, input: CreateBookmark) -> Result<Bookmark> {
        let sql = format!(
            r#"
            INSERT INTO bookmarks (url, title, comment, folder_id, favicon_color)
            VALUES (?, ?, ?, ?, ?)
            RETURNING {}
        "#,
            BOOKMARK_COLUMNS
        );

        let mut rows = self
            .conn
            .query(
                &sql,
                libsql::params![
                    input.url,
                    input.title.unwrap_or_default(),
                    input.comment,
                    input.folder_id,
                    input.favicon_color
                ],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Self::row_to_bookmark(&row)?)
        } else {
            anyhow::bail!("Failed to create bookmark")
        }
    }

    pub async fn update_bookmark(
        &self,
        id: i32,
        input: UpdateBookmark,
    ) -> Result<Option<Bookmark>> {
        if self.get_bookmark(id).await?.is_none() {
            return Ok(None);
        }

        let mut updates = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(url) = &input.url {
            updates.push("url = ?");
            params.push(url.clone().into());
        }
        if let Some(title) = &input.title {
            updates.push("title = ?");
            params.push(title.clone().into());
        }
        if let Some(comment) = &input.comment {
            updates.push("comment = ?");
            params.push(comment.clone().into());
        }
        if let Some(folder_id) = &input.folder_id {
            updates.push("folder_id = ?");
            params.push(match folder_id {
                Some(v) => (*v).into(),
                None => libsql::Value::Null,
            });
        }
        if let Some(color) = &input.favicon_color {
            updates.push("favicon_color = ?");
            params.push(color.clone().into());
        }

        if updates.is_empty() {
            return self.get_bookmark(id).await;
        }

        updates.push("updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')");
        params.push(id.into());

        let sql = format!("UPDATE bookmarks SET {} WHERE id = ?", updates.join(", "));

        self.conn.execute(&sql, params).await?;
        self.get_bookmark(id).await
    }

    pub async fn delete_bookmark(&self, id: i32) -> Result<bool> {
        let result = self
            .conn
            .execute("DELETE FROM bookmarks WHERE id = ?", libsql::params![id])
            .await?;
        Ok(result > 0)
    }

    /// Full bookmark relation in id order, for the export bundler.
    pub async fn all_bookmarks(&self) -> Result<Vec<Bookmark>> {
        let sql = format!("SELECT {} FROM bookmarks ORDER BY id", BOOKMARK_COLUMNS);
        let mut rows = self.conn.query(&sql, ()).await?;
        let mut bookmarks = Vec::new();
        while let Some(row) = rows.next().await? {
            bookmarks.push(Self::row_to_bookmark(&row)?);
        }
        Ok(bookmarks)
    }

    fn row_to_bookmark(row: &libsql::Row) -> Result<Bookmark> {
        Ok(Bookmark {
            id: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            comment: row.get(3)?,
            folder_id: row.get(4)?,
            favicon_color: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    pub async fn list_folders(&self, parent_id: Option<i32>) -> Result<Vec<Folder>> {
        let mut folders = Vec::new();

        if let Some(parent_id) = parent_id {
            let sql = format!(
                "SELECT {} FROM folders WHERE parent_id = ? ORDER BY name ASC",
                FOLDER_COLUMNS
            );
            let mut rows = self.conn.query(&sql, libsql::params![parent_id]).await?;
            while let Some(row) = rows.next().await? {
                folders.push(Self::row_to_folder(&row)?);
            }
        } else {
            let sql = format!("SELECT {} FROM folders ORDER BY name ASC", FOLDER_COLUMNS);
            let mut rows = self.conn.query(&sql, ()).await?;
            while let Some(row) = rows.next().await? {
                folders.push(Self::row_to_folder(&row)?);
            }
        }

        Ok(folders)
    }

    pub async fn get_folder(&self, id: i32) -> Result<Option<Folder>> {
        let sql = format!("SELECT {} FROM folders WHERE id = ?", FOLDER_COLUMNS);
        let mut rows = self.conn.query(&sql, libsql::params![id]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_folder(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn create_folder(&self, input: CreateFolder) -> Result<Folder> {
        let sql = format!(
            r#"
            INSERT INTO folders (name, parent_id, color)
            VALUES (?, ?, ?)
            RETURNING {}
        "#,
            FOLDER_COLUMNS
        );

        let mut rows = self
            .conn
            .query(
                &sql,
                libsql::params![input.name, input.parent_id, input.color],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Self::row_to_folder(&row)?)
        } else {
            anyhow::bail!("Failed to create folder")
        }
    }

    pub async fn update_folder(&self, id: i32, input: UpdateFolder) -> Result<Option<Folder>> {
        if self.get_folder(id).await?.is_none() {
            return Ok(None);
        }

        let mut updates = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(name) = &input.name {
            updates.push("name = ?");
            params.push(name.clone().into());
        }
        if let Some(parent_id) = &input.parent_id {
            updates.push("parent_id = ?");
            params.push(match parent_id {
                Some(v) => (*v).into(),
                None => libsql::Value::Null,
            });
        }
        if let Some(color) = &input.color {
            updates.push("color = ?");
            params.push(color.clone().into());
        }

        if updates.is_empty() {
            return self.get_folder(id).await;
        }

        updates.push("updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')");
        params.push(id.into());

        let sql = format!("UPDATE folders SET {} WHERE id = ?", updates.join(", "));

        self.conn.execute(&sql, params).await?;
        self.get_folder(id).await
    }

    pub async fn delete_folder(&self, id: i32) -> Result<bool> {
        let result = self
            .conn
            .execute("DELETE FROM folders WHERE id = ?", libsql::params![id])
            .await?;
        Ok(result > 0)
    }

    /// Full folder relation in id order, for the export bundler.
    pub async fn all_folders(&self) -> Result<Vec<Folder>> {
        let sql = format!("SELECT {} FROM folders ORDER BY id", FOLDER_COLUMNS);
        let mut rows = self.conn.query(&sql, ()).await?;
        let mut folders = Vec::new();
        while let Some(row) = rows.next().await? {
            folders.push(Self::row_to_folder(&row)?);
        }
        Ok(folders)
    }

    fn row_to_folder(row: &libsql::Row) -> Result<Folder> {
        Ok(Folder {
            id: row.get(0)?,
            name: row.get(1)?,
            parent_id: row.get(2)?,
            color: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use libsql::{Builder, Connection};

    async fn test_conn() -> Connection {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        let conn = db.connect().unwrap();
        conn.execute("PRAGMA foreign_keys = ON", ()).await.unwrap();
        Database::run_all_migrations(&conn).await.unwrap();
        conn
    }

    #[test]
    fn sort_spec_parses_whitelisted_fields() {
        let spec = SortSpec::parse("-title").unwrap();
        assert_eq!(spec.field, "title");
        assert!(spec.descending);

        let spec = SortSpec::parse("created_at").unwrap();
        assert_eq!(spec.field, "created_at");
        assert!(!spec.descending);

        assert!(SortSpec::parse("ratings").is_none());
        assert!(SortSpec::parse("title; DROP TABLE bookmarks").is_none());
    }

    #[test]
    fn sort_spec_defaults_to_newest_first() {
        let spec = SortSpec::default();
        assert_eq!(spec.field, "created_at");
        assert!(spec.descending);
    }

    #[test]
    fn update_body_detects_explicit_null() {
        let input: UpdateBookmark = serde_json::from_str(r#"{"folder_id": null}"#).unwrap();
        assert_eq!(input.folder_id, Some(None));
        assert!(!input.is_empty());

        let input: UpdateBookmark = serde_json::from_str(r#"{}"#).unwrap();
        assert!(input.folder_id.is_none());
        assert!(input.is_empty());
    }

    #[test]
    fn update_with_an_empty_required_field_is_flagged() {
        let input: UpdateBookmark = serde_json::from_str(r#"{"url": ""}"#).unwrap();
        assert!(input.blanks_required_field());
        let input: UpdateBookmark = serde_json::from_str(r#"{"url": "https://x.test"}"#).unwrap();
        assert!(!input.blanks_required_field());
        let input: UpdateBookmark = serde_json::from_str(r#"{"title": ""}"#).unwrap();
        assert!(!input.blanks_required_field());

        let input: UpdateFolder = serde_json::from_str(r#"{"name": ""}"#).unwrap();
        assert!(input.blanks_required_field());
        let input: UpdateFolder = serde_json::from_str(r#"{"color": null}"#).unwrap();
        assert!(!input.blanks_required_field());
    }

    #[tokio::test]
    async fn create_stores_url_verbatim() {
        let conn = test_conn().await;
        let catalog = Catalog::new(&conn);

        let bookmark = catalog
            .create_bookmark(CreateBookmark {
                url: "example.com".to_string(),
                title: Some("Example".to_string()),
                comment: None,
                folder_id: None,
                favicon_color: None,
            })
            .await
            .unwrap();

        // no protocol auto-prepend at write time
        assert_eq!(bookmark.url, "example.com");
        assert_eq!(bookmark.title, "Example");
        assert!(bookmark.updated_at.is_none());

        let fetched = catalog.get_bookmark(bookmark.id).await.unwrap().unwrap();
        assert_eq!(fetched.url, "example.com");
    }

    #[tokio::test]
    async fn list_paginates_and_counts() {
        let conn = test_conn().await;
        let catalog = Catalog::new(&conn);

        for i in 0..25 {
            catalog
                .create_bookmark(CreateBookmark {
                    url: format!("https://site-{:02}.test", i),
                    title: Some(format!("title-{:02}", i)),
                    comment: None,
                    folder_id: None,
                    favicon_color: None,
                })
                .await
                .unwrap();
        }

        let query = BookmarkQuery {
            sort: SortSpec::parse("-title").unwrap(),
            ..Default::default()
        };
        let page = Page::from_params(Some(2), Some(10));
        let (rows, total) = catalog.list_bookmarks(&query, &page).await.unwrap();

        assert_eq!(total, 25);
        assert_eq!(rows.len(), 10);
        // page 2 of title-descending: title-14 .. title-05
        assert_eq!(rows[0].title, "title-14");
        assert_eq!(rows[9].title, "title-05");
    }

    #[tokio::test]
    async fn search_is_case_insensitive_substring() {
        let conn = test_conn().await;
        let catalog = Catalog::new(&conn);

        for title in ["Rust Book", "weekly rust digest", "Python Notes"] {
            catalog
                .create_bookmark(CreateBookmark {
                    url: "https://example.test".to_string(),
                    title: Some(title.to_string()),
                    comment: None,
                    folder_id: None,
                    favicon_color: None,
                })
                .await
                .unwrap();
        }

        let query = BookmarkQuery {
            search: Some("RUST".to_string()),
            ..Default::default()
        };
        let page = Page::from_params(None, None);
        let (rows, total) = catalog.list_bookmarks(&query, &page).await.unwrap();

        assert_eq!(total, 2);
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn folder_filter_matches_folder_scoped_listing() {
        let conn = test_conn().await;
        let catalog = Catalog::new(&conn);

        let folder = catalog
            .create_folder(CreateFolder {
                name: "reading".to_string(),
                parent_id: None,
                color: None,
            })
            .await
            .unwrap();

        for i in 0..4 {
            catalog
                .create_bookmark(CreateBookmark {
                    url: format!("https://in-{}.test", i),
                    title: None,
                    comment: None,
                    folder_id: Some(folder.id),
                    favicon_color: None,
                })
                .await
                .unwrap();
        }
        catalog
            .create_bookmark(CreateBookmark {
                url: "https://out.test".to_string(),
                title: None,
                comment: None,
                folder_id: None,
                favicon_color: None,
            })
            .await
            .unwrap();

        let query = BookmarkQuery {
            folder_id: Some(folder.id),
            ..Default::default()
        };
        let page = Page::from_params(None, None);
        let (rows, total) = catalog.list_bookmarks(&query, &page).await.unwrap();

        assert_eq!(total, 4);
        assert!(rows.iter().all(|b| b.folder_id == Some(folder.id)));
    }

    #[tokio::test]
    async fn partial_update_preserves_other_fields() {
        let conn = test_conn().await;
        let catalog = Catalog::new(&conn);

        let bookmark = catalog
            .create_bookmark(CreateBookmark {
                url: "https://example.test".to_string(),
                title: Some("before".to_string()),
                comment: Some("keep me".to_string()),
                folder_id: None,
                favicon_color: Some("rgb(1,2,3)".to_string()),
            })
            .await
            .unwrap();

        let updated = catalog
            .update_bookmark(
                bookmark.id,
                UpdateBookmark {
                    title: Some("after".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.title, "after");
        assert_eq!(updated.url, "https://example.test");
        assert_eq!(updated.comment.as_deref(), Some("keep me"));
        assert_eq!(updated.favicon_color.as_deref(), Some("rgb(1,2,3)"));
        assert!(updated.updated_at.is_some());
    }

    #[tokio::test]
    async fn update_missing_bookmark_returns_none() {
        let conn = test_conn().await;
        let catalog = Catalog::new(&conn);

        let result = catalog
            .update_bookmark(
                999,
                UpdateBookmark {
                    title: Some("nope".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_existed() {
        let conn = test_conn().await;
        let catalog = Catalog::new(&conn);

        let bookmark = catalog
            .create_bookmark(CreateBookmark {
                url: "https://example.test".to_string(),
                title: None,
                comment: None,
                folder_id: None,
                favicon_color: None,
            })
            .await
            .unwrap();

        assert!(catalog.delete_bookmark(bookmark.id).await.unwrap());
        assert!(!catalog.delete_bookmark(bookmark.id).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_a_folder_orphans_its_bookmarks() {
        let conn = test_conn().await;
        let catalog = Catalog::new(&conn);

        let parent = catalog
            .create_folder(CreateFolder {
                name: "parent".to_string(),
                parent_id: None,
                color: None,
            })
            .await
            .unwrap();
        let child = catalog
            .create_folder(CreateFolder {
                name: "child".to_string(),
                parent_id: Some(parent.id),
                color: None,
            })
            .await
            .unwrap();
        let bookmark = catalog
            .create_bookmark(CreateBookmark {
                url: "https://example.test".to_string(),
                title: None,
                comment: None,
                folder_id: Some(parent.id),
                favicon_color: None,
            })
            .await
            .unwrap();

        assert!(catalog.delete_folder(parent.id).await.unwrap());

        let orphan = catalog.get_bookmark(bookmark.id).await.unwrap().unwrap();
        assert_eq!(orphan.folder_id, None);
        let child = catalog.get_folder(child.id).await.unwrap().unwrap();
        assert_eq!(child.parent_id, None);
    }

    #[tokio::test]
    async fn folders_list_by_name_with_optional_parent_filter() {
        let conn = test_conn().await;
        let catalog = Catalog::new(&conn);

        let root = catalog
            .create_folder(CreateFolder {
                name: "zebra".to_string(),
                parent_id: None,
                color: None,
            })
            .await
            .unwrap();
        catalog
            .create_folder(CreateFolder {
                name: "alpha".to_string(),
                parent_id: None,
                color: None,
            })
            .await
            .unwrap();
        catalog
            .create_folder(CreateFolder {
                name: "nested".to_string(),
                parent_id: Some(root.id),
                color: None,
            })
            .await
            .unwrap();

        let all = catalog.list_folders(None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].name, "alpha");
        assert_eq!(all[2].name, "zebra");

        let children = catalog.list_folders(Some(root.id)).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "nested");
    }
}
