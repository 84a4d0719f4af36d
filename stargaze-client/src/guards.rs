//! Guard layer: decide whether a fetch is needed
//!
//! Every load intent is an explicit command interpreted by [`plan`] against
//! a read-only state snapshot. A guard returns `None` when there is nothing
//! to do (cached, in flight, invalid input) and a descriptor otherwise.
//! Guards never perform I/O and never mutate state; the in-flight flag they
//! consult is maintained by the reducers reacting to lifecycle actions.

use remote_dispatch::{ApiRequest, Method, Schema};
use serde_json::Value;
use url::Url;

use crate::action::{
    CONTENT, CONTENT_SAVE, FORM, REPO, SCHEMA, SESSION, STARGAZERS, STARRED, URL, USER,
};
use crate::schemas;
use crate::state::AppState;

/// The logical api targets guards address.
pub const API: &str = "api";
pub const GITHUB: &str = "github";

/// A declarative load/save command, planned against current state.
#[derive(Clone, Debug, PartialEq)]
pub enum Intent {
    LoadUser {
        login: String,
    },
    LoadRepo {
        full_name: String,
        required_fields: Vec<String>,
    },
    LoadStarred {
        login: String,
        next_page: bool,
    },
    LoadStargazers {
        full_name: String,
        next_page: bool,
    },
    LoadUrl {
        url: String,
    },
    LoadForm {
        form_id: String,
    },
    LoadSchema {
        id: Option<String>,
    },
    LoadSession,
    LoadContent {
        type_id: String,
        entity_id: String,
    },
    SaveContent {
        type_id: String,
        entity_id: String,
        body: Value,
    },
}

/// Interpret an intent: `None` means nothing to do.
pub fn plan(intent: &Intent, state: &AppState) -> Option<ApiRequest> {
    match intent {
        Intent::LoadUser { login } => load_user(login, state),
        Intent::LoadRepo {
            full_name,
            required_fields,
        } => load_repo(full_name, required_fields, state),
        Intent::LoadStarred { login, next_page } => load_starred(login, *next_page, state),
        Intent::LoadStargazers {
            full_name,
            next_page,
        } => load_stargazers(full_name, *next_page, state),
        Intent::LoadUrl { url } => load_url(url, state),
        Intent::LoadForm { form_id } => load_form(form_id, state),
        Intent::LoadSchema { id } => load_schema(id.as_deref(), state),
        Intent::LoadSession => load_session(state),
        Intent::LoadContent {
            type_id,
            entity_id,
        } => load_content(type_id, entity_id, state),
        Intent::SaveContent {
            type_id,
            entity_id,
            body,
        } => Some(save_request(type_id, entity_id, body)),
    }
}

/// Fetch a single user unless it is cached.
pub fn load_user(login: &str, state: &AppState) -> Option<ApiRequest> {
    if state.has_entity("users", login) {
        return None;
    }
    Some(
        ApiRequest::new(
            API,
            format!("user/email/{}", login),
            Schema::Entity(schemas::user()),
            USER,
        )
        .with_meta("login", login),
    )
}

/// Fetch a single repository unless it is cached with all required fields.
pub fn load_repo(full_name: &str, required_fields: &[String], state: &AppState) -> Option<ApiRequest> {
    if state.entity_has_fields("repos", full_name, required_fields) {
        return None;
    }
    Some(
        ApiRequest::new(
            GITHUB,
            format!("repos/{}", full_name),
            Schema::Entity(schemas::repo()),
            REPO,
        )
        .with_meta("fullName", full_name),
    )
}

/// Fetch a page of repos starred by a user.
///
/// Bails out if a page is cached and the caller did not explicitly request
/// the next one; stops once the cursor has no continuation left.
pub fn load_starred(login: &str, next_page: bool, state: &AppState) -> Option<ApiRequest> {
    let cursor = state.pagination.starred_by_user.get(login);
    let page_count = cursor.map_or(0, |c| c.page_count);
    if page_count > 0 && !next_page {
        return None;
    }
    let endpoint = match cursor.and_then(|c| c.next_page_url.clone()) {
        Some(next) => next,
        None if page_count == 0 => format!("users/{}/starred", login),
        // Last page already fetched.
        None => return None,
    };
    Some(
        ApiRequest::new(GITHUB, endpoint, Schema::List(schemas::repo()), STARRED)
            .with_meta("login", login),
    )
}

/// Fetch a page of stargazers of a repo; same cursor rules as
/// [`load_starred`].
pub fn load_stargazers(full_name: &str, next_page: bool, state: &AppState) -> Option<ApiRequest> {
    let cursor = state.pagination.stargazers_by_repo.get(full_name);
    let page_count = cursor.map_or(0, |c| c.page_count);
    if page_count > 0 && !next_page {
        return None;
    }
    let endpoint = match cursor.and_then(|c| c.next_page_url.clone()) {
        Some(next) => next,
        None if page_count == 0 => format!("repos/{}/stargazers", full_name),
        None => return None,
    };
    Some(
        ApiRequest::new(GITHUB, endpoint, Schema::List(schemas::user()), STARGAZERS)
            .with_meta("fullName", full_name),
    )
}

/// Fetch external url content, once per url.
///
/// Syntactically invalid input is rejected outright: no dispatch, nothing
/// recorded. A url already in flight or already cached is a no-op.
pub fn load_url(url: &str, state: &AppState) -> Option<ApiRequest> {
    if Url::parse(url).is_err() {
        return None;
    }
    let request = ApiRequest::new(
        API,
        format!("content/url?subject=thing&url={}", urlencoding::encode(url)),
        Schema::Entity(schemas::url_item()),
        URL,
    )
    .with_meta("url", url);

    if state.inflight.is_pending(&request.fingerprint()) {
        return None;
    }
    if state.has_entity("url", url) {
        return None;
    }
    Some(request)
}

/// Fetch a form definition unless it is cached.
pub fn load_form(form_id: &str, state: &AppState) -> Option<ApiRequest> {
    if state.has_entity("forms", form_id) {
        return None;
    }
    Some(
        ApiRequest::new(
            API,
            format!("content/type/{}", form_id),
            Schema::Entity(schemas::form()),
            FORM,
        )
        .with_meta("formId", form_id),
    )
}

/// Fetch one schema definition, or the whole registry when `id` is `None`.
///
/// A definition counts as cached only once its `property` field is present;
/// the registry counts as cached once the root `Thing` definition exists.
pub fn load_schema(id: Option<&str>, state: &AppState) -> Option<ApiRequest> {
    match id {
        Some(id) => {
            if state.entity_has_fields("schema", id, &["property".to_string()]) {
                return None;
            }
            Some(
                ApiRequest::new(
                    API,
                    format!("schema/{}", id),
                    Schema::Entity(schemas::schema_record()),
                    SCHEMA,
                )
                .with_meta("schemaId", id),
            )
        }
        None => {
            if state.has_entity("schema", "Thing") {
                return None;
            }
            Some(ApiRequest::new(
                API,
                "schema",
                Schema::List(schemas::schema_record()),
                SCHEMA,
            ))
        }
    }
}

/// Fetch the current session unless it is cached.
pub fn load_session(state: &AppState) -> Option<ApiRequest> {
    if state.has_entity("session", "current") {
        return None;
    }
    Some(fetch_session())
}

pub(crate) fn fetch_session() -> ApiRequest {
    ApiRequest::new(API, "user/me", Schema::Entity(schemas::session()), SESSION)
}

/// Fetch a content entity unless its composite key is cached.
pub fn load_content(type_id: &str, entity_id: &str, state: &AppState) -> Option<ApiRequest> {
    if state.has_entity("content", &schemas::content_key(type_id, entity_id)) {
        return None;
    }
    Some(fetch_content(type_id, entity_id))
}

pub(crate) fn fetch_content(type_id: &str, entity_id: &str) -> ApiRequest {
    ApiRequest::new(
        API,
        format!("content/{}/{}", type_id, entity_id),
        Schema::Entity(schemas::content(type_id, entity_id)),
        CONTENT,
    )
    .with_meta("typeId", type_id)
    .with_meta("entityId", entity_id)
}

/// Writes always dispatch: a mutation has no cache to consult.
pub(crate) fn save_request(type_id: &str, entity_id: &str, body: &Value) -> ApiRequest {
    ApiRequest::new(
        API,
        format!("content/{}/{}", type_id, entity_id),
        Schema::Entity(schemas::content(type_id, entity_id)),
        CONTENT_SAVE,
    )
    .with_method(Method::Put)
    .with_body(body.clone())
    .with_meta("typeId", type_id)
    .with_meta("entityId", entity_id)
}
