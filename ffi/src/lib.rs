//! C-ABI wrapper around `portail-core`.
//!
//! # Overview
//! Exposes sign-in, session restore and the paginated list screens through
//! `extern "C"` functions, so a mobile shell can build requests, execute
//! them with its own HTTP stack, and feed responses back without linking to
//! serde or an async runtime.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Account calls mirror the core `build_*` / `parse_*` pairs; results come
//!   back in a single `FfiPortalResult` envelope tagged by `FfiDataTag`.
//! - A list handle owns one `Paginator`. Triggers (`refresh`, `load_more`,
//!   `set_filter`) hand out an `FfiPageRequest`; the host executes it and
//!   returns the response with the same ticket.
//! - The C caller owns all returned pointers and must call the matching
//!   `portail_free_*` function to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use portail_core::{
    ApiConfig, ErrorLog, Filter, HttpResponse, JsonFileStore, KeyValueStore, ListItem,
    LoadOutcome, LoadTicket, LoginRequest, MemoryStore, Paginator, PortalClient, Session,
    StoredUser, ThemeMode, ThemeStore, TransportError,
};

use types::*;

/// Borrow a C string as UTF-8. `None` for null or invalid UTF-8.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
unsafe fn read_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        None
    } else {
        CStr::from_ptr(ptr).to_str().ok()
    }
}

/// Run every list variant through the same generic body.
macro_rules! each_list {
    ($kind:expr, $p:ident => $body:expr) => {
        match $kind {
            ListKind::Prestations($p) => $body,
            ListKind::Prescriptions($p) => $body,
            ListKind::Ordonnances($p) => $body,
        }
    };
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a client.
///
/// `base_url` null means the environment configuration (`PORTAIL_ENV`,
/// `PORTAIL_API_URL`). `timeout_ms` 0 keeps the environment's timeout.
/// `storage_path` null keeps the session in memory; otherwise the session
/// and theme are persisted to that JSON file.
///
/// Returns null on an unknown environment or an internal panic.
/// The caller must free the returned pointer with `portail_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn portail_client_new(
    base_url: *const c_char,
    timeout_ms: u64,
    storage_path: *const c_char,
) -> *mut FfiPortalClient {
    catch_unwind(|| {
        let mut config = match unsafe { read_str(base_url) } {
            Some(url) => ApiConfig::new(
                url,
                portail_core::Environment::Development.api_config().timeout,
            ),
            None => match ApiConfig::from_env() {
                Ok(config) => config,
                Err(_) => return std::ptr::null_mut(),
            },
        };
        if timeout_ms > 0 {
            config.timeout = Duration::from_millis(timeout_ms);
        }

        let store: Arc<dyn KeyValueStore> = match unsafe { read_str(storage_path) } {
            Some(path) => Arc::new(JsonFileStore::new(path)),
            None => Arc::new(MemoryStore::new()),
        };
        let theme = ThemeStore::load(Arc::clone(&store));
        let inner = PortalClient::new(&config, Session::new(store), Arc::new(ErrorLog::new()));
        Box::into_raw(Box::new(FfiPortalClient { inner, theme }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `portail_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn portail_client_free(client: *mut FfiPortalClient) {
    if !client.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(client) });
        }));
    }
}

/// Restore a session saved by the host, as returned by
/// `portail_client_session_json`.
#[unsafe(no_mangle)]
pub extern "C" fn portail_client_set_session(
    client: *const FfiPortalClient,
    user_json: *const c_char,
) -> FfiErrorCode {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() || user_json.is_null() {
            return FfiErrorCode::NullArg;
        }
        let client = unsafe { &*client };
        let Some(json) = (unsafe { read_str(user_json) }) else {
            return FfiErrorCode::InvalidArg;
        };
        let Ok(user) = serde_json::from_str::<StoredUser>(json) else {
            return FfiErrorCode::InvalidArg;
        };
        match client.inner.session().save_user(&user) {
            Ok(()) => FfiErrorCode::Ok,
            Err(_) => FfiErrorCode::Unknown,
        }
    }))
    .unwrap_or(FfiErrorCode::Panic)
}

/// The stored user as JSON, or null when signed out.
/// Free with `portail_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn portail_client_session_json(client: *const FfiPortalClient) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        client
            .inner
            .session()
            .current_user()
            .and_then(|user| serde_json::to_string(&user).ok())
            .map_or(std::ptr::null_mut(), c_string)
    }))
    .unwrap_or(std::ptr::null_mut())
}

#[unsafe(no_mangle)]
pub extern "C" fn portail_client_is_authenticated(client: *const FfiPortalClient) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        !client.is_null() && unsafe { &*client }.inner.session().is_authenticated()
    }))
    .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// Build the sign-in request.
///
/// Returns null if any argument is null or not UTF-8.
/// The caller must free the returned pointer with `portail_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn portail_build_login(
    client: *const FfiPortalClient,
    login: *const c_char,
    password: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        let (Some(login), Some(password)) =
            (unsafe { read_str(login) }, unsafe { read_str(password) })
        else {
            return std::ptr::null_mut();
        };
        let input = LoginRequest {
            login: login.to_string(),
            password: password.to_string(),
        };
        match client.inner.build_login(&input) {
            Ok(req) => FfiHttpRequest::from_core(req),
            Err(_) => std::ptr::null_mut(),
        }
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Convert an `FfiHttpResponse` to a core `HttpResponse`. A null body reads
/// as empty.
fn ffi_response_to_core(resp: &FfiHttpResponse) -> HttpResponse {
    let body = unsafe { read_str(resp.body) }.unwrap_or("").to_string();
    HttpResponse::new(resp.status, body)
}

/// Parse the sign-in response. On success the session is stored and the
/// result carries `data_tag = User`.
#[unsafe(no_mangle)]
pub extern "C" fn portail_parse_login(
    client: *const FfiPortalClient,
    response: *const FfiHttpResponse,
) -> *mut FfiPortalResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiPortalResult::null_arg("client");
        }
        if response.is_null() {
            return FfiPortalResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = ffi_response_to_core(unsafe { &*response });
        match client.inner.parse_login(resp) {
            Ok(user) => FfiPortalResult::ok_user(&user),
            Err(e) => FfiPortalResult::from_error(&e),
        }
    }))
    .unwrap_or_else(|_| FfiPortalResult::panic("panic in portail_parse_login"))
}

#[unsafe(no_mangle)]
pub extern "C" fn portail_build_logout(client: *const FfiPortalClient) -> *mut FfiHttpRequest {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        FfiHttpRequest::from_core(unsafe { &*client }.inner.build_logout())
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Parse the sign-out response. The local session is cleared either way.
#[unsafe(no_mangle)]
pub extern "C" fn portail_parse_logout(
    client: *const FfiPortalClient,
    response: *const FfiHttpResponse,
) -> *mut FfiPortalResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiPortalResult::null_arg("client");
        }
        let client = unsafe { &*client };
        if response.is_null() {
            let _ = client.inner.session().clear();
            return FfiPortalResult::null_arg("response");
        }
        let resp = ffi_response_to_core(unsafe { &*response });
        match client.inner.parse_logout(resp) {
            Ok(()) => FfiPortalResult::ok_empty(),
            Err(e) => FfiPortalResult::from_error(&e),
        }
    }))
    .unwrap_or_else(|_| FfiPortalResult::panic("panic in portail_parse_logout"))
}

// ---------------------------------------------------------------------------
// Theme
// ---------------------------------------------------------------------------

#[unsafe(no_mangle)]
pub extern "C" fn portail_theme_is_dark(client: *const FfiPortalClient) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        !client.is_null() && unsafe { &*client }.theme.is_dark()
    }))
    .unwrap_or(false)
}

/// Switch light/dark and persist the choice. Returns whether dark is now on;
/// a storage failure still switches for this run.
#[unsafe(no_mangle)]
pub extern "C" fn portail_theme_toggle(client: *mut FfiPortalClient) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return false;
        }
        let client = unsafe { &mut *client };
        match client.theme.toggle_theme() {
            Ok(mode) => mode == ThemeMode::Dark,
            Err(_) => client.theme.is_dark(),
        }
    }))
    .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Lists
// ---------------------------------------------------------------------------

/// Create a list handle for `resource`. A `page_size` of 0 is treated as 1.
/// Free with `portail_list_free`.
#[unsafe(no_mangle)]
pub extern "C" fn portail_list_new(resource: FfiResource, page_size: u32) -> *mut FfiList {
    catch_unwind(|| {
        Box::into_raw(Box::new(FfiList {
            kind: ListKind::new(resource, page_size),
        }))
    })
    .unwrap_or(std::ptr::null_mut())
}

#[unsafe(no_mangle)]
pub extern "C" fn portail_list_free(list: *mut FfiList) {
    if !list.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(list) });
        }));
    }
}

/// Build the request for `ticket`. A build failure completes the ticket as
/// failed so the list does not stay loading.
fn page_request<T: ListItem>(
    client: &PortalClient,
    p: &mut Paginator<T>,
    ticket: LoadTicket,
) -> *mut FfiPageRequest {
    match client.build_page_request::<T>(p.filter(), &ticket) {
        Ok(req) => Box::into_raw(Box::new(FfiPageRequest {
            ticket: ticket.into(),
            request: FfiHttpRequest::from_core(req),
        })),
        Err(err) => {
            p.complete(ticket, Err(err));
            std::ptr::null_mut()
        }
    }
}

fn complete_with<T: ListItem>(
    client: &PortalClient,
    p: &mut Paginator<T>,
    ticket: LoadTicket,
    response: HttpResponse,
) -> LoadOutcome {
    let result = client.parse_list::<T>(response);
    p.complete(ticket, result)
}

fn fail_with<T: ListItem>(
    client: &PortalClient,
    p: &mut Paginator<T>,
    ticket: LoadTicket,
    err: TransportError,
) -> LoadOutcome {
    let err = client.fail(err, T::RESOURCE.path());
    p.complete(ticket, Err(err))
}

fn outcome(o: LoadOutcome) -> FfiLoadOutcome {
    match o {
        LoadOutcome::Loaded { .. } => FfiLoadOutcome::Loaded,
        LoadOutcome::Failed => FfiLoadOutcome::Failed,
        LoadOutcome::Stale => FfiLoadOutcome::Stale,
    }
}

/// Apply a filter and start over from page 0.
///
/// Dates are `YYYY-MM-DD`. `garantie` may be null or empty for all
/// coverages; `matricule` and `prestataire_id` at 0 or below mean no
/// constraint (the provider then defaults to the signed-in user's).
/// Returns null, leaving the list untouched, when the dates are invalid or
/// the end date precedes the start date.
#[unsafe(no_mangle)]
pub extern "C" fn portail_list_set_filter(
    list: *mut FfiList,
    client: *const FfiPortalClient,
    date_debut: *const c_char,
    date_fin: *const c_char,
    garantie: *const c_char,
    matricule: i64,
    prestataire_id: i64,
) -> *mut FfiPageRequest {
    catch_unwind(AssertUnwindSafe(|| {
        if list.is_null() || client.is_null() {
            return std::ptr::null_mut();
        }
        let (list, client) = unsafe { (&mut *list, &*client) };
        let parse = |ptr: *const c_char| -> Option<chrono::NaiveDate> {
            unsafe { read_str(ptr) }.and_then(|s| s.trim().parse().ok())
        };
        let (Some(debut), Some(fin)) = (parse(date_debut), parse(date_fin)) else {
            return std::ptr::null_mut();
        };
        let Ok(mut filter) = Filter::new(debut, fin) else {
            return std::ptr::null_mut();
        };
        if let Some(garantie) = unsafe { read_str(garantie) } {
            filter = filter.with_garantie(garantie);
        }
        if matricule > 0 {
            filter = filter.with_matricule(matricule);
        }
        if prestataire_id > 0 {
            filter = filter.with_prestataire(prestataire_id);
        }
        each_list!(&mut list.kind, p => {
            let ticket = p.set_filter(filter);
            page_request(&client.inner, p, ticket)
        })
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Reload from page 0 (pull-to-refresh, retry). Never null for valid
/// handles unless the request cannot be built.
#[unsafe(no_mangle)]
pub extern "C" fn portail_list_refresh(
    list: *mut FfiList,
    client: *const FfiPortalClient,
) -> *mut FfiPageRequest {
    catch_unwind(AssertUnwindSafe(|| {
        if list.is_null() || client.is_null() {
            return std::ptr::null_mut();
        }
        let (list, client) = unsafe { (&mut *list, &*client) };
        each_list!(&mut list.kind, p => {
            let ticket = p.refresh();
            page_request(&client.inner, p, ticket)
        })
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Next page when the end of the list is on screen. Returns null when the
/// list is complete or a load is already in flight.
#[unsafe(no_mangle)]
pub extern "C" fn portail_list_load_more(
    list: *mut FfiList,
    client: *const FfiPortalClient,
) -> *mut FfiPageRequest {
    catch_unwind(AssertUnwindSafe(|| {
        if list.is_null() || client.is_null() {
            return std::ptr::null_mut();
        }
        let (list, client) = unsafe { (&mut *list, &*client) };
        each_list!(&mut list.kind, p => match p.load_more() {
            Some(ticket) => page_request(&client.inner, p, ticket),
            None => std::ptr::null_mut(),
        })
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Feed back the response for `ticket`.
#[unsafe(no_mangle)]
pub extern "C" fn portail_list_complete(
    list: *mut FfiList,
    client: *const FfiPortalClient,
    ticket: *const FfiLoadTicket,
    response: *const FfiHttpResponse,
) -> FfiLoadOutcome {
    catch_unwind(AssertUnwindSafe(|| {
        if list.is_null() || client.is_null() || ticket.is_null() || response.is_null() {
            return FfiLoadOutcome::Invalid;
        }
        let (list, client) = unsafe { (&mut *list, &*client) };
        let ticket = LoadTicket::from(unsafe { *ticket });
        let resp = ffi_response_to_core(unsafe { &*response });
        outcome(each_list!(&mut list.kind, p => complete_with(&client.inner, p, ticket, resp)))
    }))
    .unwrap_or(FfiLoadOutcome::Invalid)
}

/// Report that the request for `ticket` got no response. `message` may be
/// null.
#[unsafe(no_mangle)]
pub extern "C" fn portail_list_transport_failed(
    list: *mut FfiList,
    client: *const FfiPortalClient,
    ticket: *const FfiLoadTicket,
    kind: FfiTransportError,
    message: *const c_char,
) -> FfiLoadOutcome {
    catch_unwind(AssertUnwindSafe(|| {
        if list.is_null() || client.is_null() || ticket.is_null() {
            return FfiLoadOutcome::Invalid;
        }
        let (list, client) = unsafe { (&mut *list, &*client) };
        let ticket = LoadTicket::from(unsafe { *ticket });
        let message = unsafe { read_str(message) }.unwrap_or("").to_string();
        let err = kind.into_core(message);
        outcome(each_list!(&mut list.kind, p => fail_with(&client.inner, p, ticket, err)))
    }))
    .unwrap_or(FfiLoadOutcome::Invalid)
}

/// Snapshot of the list. A null handle reports `NullArg`.
#[unsafe(no_mangle)]
pub extern "C" fn portail_list_state(list: *const FfiList) -> FfiListState {
    catch_unwind(AssertUnwindSafe(|| {
        if list.is_null() {
            return FfiListState::empty();
        }
        each_list!(&unsafe { &*list }.kind, p => FfiListState::of(p))
    }))
    .unwrap_or_else(|_| FfiListState::empty())
}

/// Loaded rows as a JSON array of view-models.
/// Free with `portail_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn portail_list_items_json(list: *const FfiList) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| {
        if list.is_null() {
            return std::ptr::null_mut();
        }
        let json = each_list!(&unsafe { &*list }.kind, p => serde_json::to_string(p.items()));
        json.map_or(std::ptr::null_mut(), c_string)
    }))
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Error helpers
// ---------------------------------------------------------------------------

/// French message to show for an error. Free with `portail_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn portail_error_message(code: FfiErrorCode, http_status: u16) -> *mut c_char {
    catch_unwind(|| c_string(portail_core::user_friendly_message(code.to_core(http_status))))
        .unwrap_or(std::ptr::null_mut())
}

/// Whether offering a retry makes sense for this error.
#[unsafe(no_mangle)]
pub extern "C" fn portail_is_recoverable(code: FfiErrorCode, http_status: u16) -> bool {
    portail_core::is_recoverable(code.to_core(http_status))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

fn free_request_fields(req: &FfiHttpRequest) {
    if !req.url.is_null() {
        drop(unsafe { CString::from_raw(req.url) });
    }
    if !req.body.is_null() {
        drop(unsafe { CString::from_raw(req.body) });
    }
    if !req.headers.is_null() && req.headers_len > 0 {
        let headers = unsafe {
            Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                req.headers,
                req.headers_len as usize,
            ))
        };
        for h in headers.iter() {
            if !h.key.is_null() {
                drop(unsafe { CString::from_raw(h.key) });
            }
            if !h.value.is_null() {
                drop(unsafe { CString::from_raw(h.value) });
            }
        }
    }
}

/// Free an `FfiHttpRequest` returned by any `portail_build_*` function.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn portail_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let req = unsafe { Box::from_raw(req) };
        free_request_fields(&req);
    }));
}

/// Free an `FfiPageRequest` returned by the list triggers, including its
/// request. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn portail_free_page_request(page: *mut FfiPageRequest) {
    if page.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let page = unsafe { Box::from_raw(page) };
        portail_free_request(page.request);
    }));
}

/// Free an `FfiPortalResult`. Safe to call with null. Uses `data_tag` to
/// determine what `data` points to.
#[unsafe(no_mangle)]
pub extern "C" fn portail_free_result(result: *mut FfiPortalResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let result = unsafe { Box::from_raw(result) };
        for msg in [result.error_message, result.user_message] {
            if !msg.is_null() {
                drop(unsafe { CString::from_raw(msg) });
            }
        }
        if !result.data.is_null() {
            match result.data_tag {
                FfiDataTag::User => {
                    let user = unsafe { Box::from_raw(result.data as *mut FfiUser) };
                    for s in [user.login, user.display_name] {
                        if !s.is_null() {
                            drop(unsafe { CString::from_raw(s) });
                        }
                    }
                }
                FfiDataTag::None => {}
            }
        }
    }));
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn portail_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { CString::from_raw(s) });
        });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
