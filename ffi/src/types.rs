//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointers instead of `Vec`, and
//! tagged enums with explicit discriminants. Conversion functions live here
//! to keep `lib.rs` focused on the `extern "C"` surface.

use std::ffi::CString;
use std::os::raw::c_char;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use portail_core::{
    ApiError, ErrorCode, HttpMethod, HttpRequest, LoadMode, LoadTicket, Ordonnance, Paginator,
    PortalClient, Prescription, Prestation, StoredUser, ThemeStore, TransportError,
};

/// Everything but the RFC 3986 unreserved characters.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Heap C string from a Rust string. Interior NULs are dropped.
pub(crate) fn c_string(s: impl Into<String>) -> *mut c_char {
    let s: String = s.into();
    CString::new(s.replace('\0', ""))
        .unwrap_or_default()
        .into_raw()
}

/// Opaque handle to a `PortalClient` and the theme stored next to its
/// session. C callers receive a pointer to this and pass it back into every
/// FFI function.
pub struct FfiPortalClient {
    pub(crate) inner: PortalClient,
    pub(crate) theme: ThemeStore,
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
    Put = 2,
    Delete = 3,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
            HttpMethod::Put => FfiHttpMethod::Put,
            HttpMethod::Delete => FfiHttpMethod::Delete,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
///
/// `url` is absolute. The C caller executes the request within
/// `timeout_ms` and passes the response back through `portail_parse_*` or
/// `portail_list_complete`.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
    pub timeout_ms: u64,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    ///
    /// Query parameters are percent-encoded and folded into the URL.
    pub(crate) fn from_core(req: HttpRequest) -> *mut Self {
        let mut url = req.path;
        if !req.query.is_empty() {
            let query: Vec<String> = req
                .query
                .iter()
                .map(|(k, v)| {
                    format!(
                        "{}={}",
                        utf8_percent_encode(k, QUERY_ENCODE_SET),
                        utf8_percent_encode(v, QUERY_ENCODE_SET)
                    )
                })
                .collect();
            url.push('?');
            url.push_str(&query.join("&"));
        }
        let body = match req.body {
            Some(b) => c_string(b),
            None => std::ptr::null_mut(),
        };

        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Box<[FfiHeader]> = req
                .headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: c_string(k),
                    value: c_string(v),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            url: c_string(url),
            headers,
            headers_len,
            body,
            timeout_ms: req.timeout.as_millis() as u64,
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The C caller constructs this on the stack after executing an HTTP request.
/// The FFI layer reads but does not free these fields.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

/// Why the host could not get a response at all.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiTransportError {
    Timeout = 0,
    Connect = 1,
    Other = 2,
}

impl FfiTransportError {
    pub(crate) fn into_core(self, message: String) -> TransportError {
        match self {
            FfiTransportError::Timeout => TransportError::Timeout,
            FfiTransportError::Connect => TransportError::Connect(message),
            FfiTransportError::Other => TransportError::Other(message),
        }
    }
}

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// Error categories returned across the boundary.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    Unauthorized = 1,
    NotFound = 2,
    Http = 3,
    Rejected = 4,
    Network = 5,
    Timeout = 6,
    Deserialization = 7,
    Serialization = 8,
    Unknown = 9,
    Panic = 10,
    NullArg = 11,
    InvalidArg = 12,
}

impl FfiErrorCode {
    /// Category and HTTP status (0 when not an HTTP failure).
    pub(crate) fn from_api(err: &ApiError) -> (Self, u16) {
        match err {
            ApiError::Unauthorized { .. } => (FfiErrorCode::Unauthorized, 401),
            ApiError::NotFound => (FfiErrorCode::NotFound, 404),
            ApiError::Http { status, .. } => (FfiErrorCode::Http, *status),
            ApiError::Rejected { .. } => (FfiErrorCode::Rejected, 0),
            ApiError::Network(_) => (FfiErrorCode::Network, 0),
            ApiError::Timeout => (FfiErrorCode::Timeout, 0),
            ApiError::Deserialization(_) => (FfiErrorCode::Deserialization, 0),
            ApiError::Serialization(_) => (FfiErrorCode::Serialization, 0),
            ApiError::Unknown(_) => (FfiErrorCode::Unknown, 0),
        }
    }

    /// The core classification used for messages and retry hints.
    pub(crate) fn to_core(self, http_status: u16) -> ErrorCode {
        match self {
            FfiErrorCode::Network => ErrorCode::Network,
            FfiErrorCode::Timeout => ErrorCode::Timeout,
            FfiErrorCode::Unauthorized => ErrorCode::Status(401),
            FfiErrorCode::NotFound => ErrorCode::Status(404),
            FfiErrorCode::Http => ErrorCode::Status(http_status),
            _ => ErrorCode::Unknown,
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Tag that tells `portail_free_result` what `FfiPortalResult::data` points to.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiDataTag {
    None = 0,
    User = 1,
}

/// The signed-in user exposed to C. Missing ids are 0.
#[repr(C)]
pub struct FfiUser {
    pub id: i64,
    pub login: *mut c_char,
    pub display_name: *mut c_char,
    pub filiale_id: i64,
    pub prestataire_id: i64,
}

impl FfiUser {
    pub(crate) fn from_core(user: &StoredUser) -> Self {
        FfiUser {
            id: user.id,
            login: c_string(user.login.as_str()),
            display_name: c_string(user.display_name()),
            filiale_id: user.filiale_id.unwrap_or(0),
            prestataire_id: user.prestataire_id.unwrap_or(0),
        }
    }
}

/// Result envelope for account operations.
///
/// On success `error_code` is `Ok`, both messages are null, and `data`
/// points to the payload tagged by `data_tag`. On failure `error_message`
/// carries the technical cause, `user_message` the text to show, and
/// `data` is null.
#[repr(C)]
pub struct FfiPortalResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub user_message: *mut c_char,
    pub http_status: u16,
    pub data_tag: FfiDataTag,
    pub data: *mut std::ffi::c_void,
}

impl FfiPortalResult {
    fn boxed(
        error_code: FfiErrorCode,
        error_message: *mut c_char,
        user_message: *mut c_char,
        http_status: u16,
    ) -> *mut Self {
        Box::into_raw(Box::new(FfiPortalResult {
            error_code,
            error_message,
            user_message,
            http_status,
            data_tag: FfiDataTag::None,
            data: std::ptr::null_mut(),
        }))
    }

    pub(crate) fn ok_user(user: &StoredUser) -> *mut Self {
        let result = Box::new(FfiPortalResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            user_message: std::ptr::null_mut(),
            http_status: 0,
            data_tag: FfiDataTag::User,
            data: Box::into_raw(Box::new(FfiUser::from_core(user))) as *mut std::ffi::c_void,
        });
        Box::into_raw(result)
    }

    pub(crate) fn ok_empty() -> *mut Self {
        Self::boxed(FfiErrorCode::Ok, std::ptr::null_mut(), std::ptr::null_mut(), 0)
    }

    pub(crate) fn from_error(err: &ApiError) -> *mut Self {
        let (code, status) = FfiErrorCode::from_api(err);
        Self::boxed(
            code,
            c_string(err.to_string()),
            c_string(portail_core::user_friendly_message(err.code())),
            status,
        )
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::boxed(
            FfiErrorCode::NullArg,
            c_string(format!("null argument: {name}")),
            std::ptr::null_mut(),
            0,
        )
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::boxed(FfiErrorCode::Panic, c_string(msg), std::ptr::null_mut(), 0)
    }
}

// ---------------------------------------------------------------------------
// Lists
// ---------------------------------------------------------------------------

/// Which list screen a handle drives.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiResource {
    Prestations = 0,
    Prescriptions = 1,
    Ordonnances = 2,
}

/// Opaque handle to one paginated list.
pub struct FfiList {
    pub(crate) kind: ListKind,
}

pub(crate) enum ListKind {
    Prestations(Paginator<Prestation>),
    Prescriptions(Paginator<Prescription>),
    Ordonnances(Paginator<Ordonnance>),
}

impl ListKind {
    pub(crate) fn new(resource: FfiResource, page_size: u32) -> Self {
        match resource {
            FfiResource::Prestations => ListKind::Prestations(Paginator::new(page_size)),
            FfiResource::Prescriptions => ListKind::Prescriptions(Paginator::new(page_size)),
            FfiResource::Ordonnances => ListKind::Ordonnances(Paginator::new(page_size)),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiLoadMode {
    Replace = 0,
    Append = 1,
}

/// Identifies one in-flight list load. Hand it back unchanged to
/// `portail_list_complete` or `portail_list_transport_failed`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FfiLoadTicket {
    pub page: u32,
    pub mode: FfiLoadMode,
    pub generation: u64,
    pub index: u32,
    pub size: u32,
}

impl From<LoadTicket> for FfiLoadTicket {
    fn from(t: LoadTicket) -> Self {
        FfiLoadTicket {
            page: t.page,
            mode: match t.mode {
                LoadMode::Replace => FfiLoadMode::Replace,
                LoadMode::Append => FfiLoadMode::Append,
            },
            generation: t.generation,
            index: t.index,
            size: t.size,
        }
    }
}

impl From<FfiLoadTicket> for LoadTicket {
    fn from(t: FfiLoadTicket) -> Self {
        LoadTicket {
            page: t.page,
            mode: match t.mode {
                FfiLoadMode::Replace => LoadMode::Replace,
                FfiLoadMode::Append => LoadMode::Append,
            },
            generation: t.generation,
            index: t.index,
            size: t.size,
        }
    }
}

/// A list load to execute: the ticket plus the request for that page.
#[repr(C)]
pub struct FfiPageRequest {
    pub ticket: FfiLoadTicket,
    pub request: *mut FfiHttpRequest,
}

/// What `portail_list_complete` did with a response.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiLoadOutcome {
    Loaded = 0,
    Failed = 1,
    Stale = 2,
    Invalid = 3,
}

/// Snapshot of a list for rendering.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FfiListState {
    pub item_count: u32,
    pub total_items: u64,
    /// Last loaded page, -1 before the first load.
    pub current_page: i64,
    pub has_more: bool,
    pub loading_initial: bool,
    pub loading_more: bool,
    pub error_code: FfiErrorCode,
    pub http_status: u16,
}

impl FfiListState {
    pub(crate) fn of<T>(p: &Paginator<T>) -> Self {
        let (error_code, http_status) = p
            .error()
            .map(FfiErrorCode::from_api)
            .unwrap_or((FfiErrorCode::Ok, 0));
        FfiListState {
            item_count: p.items().len() as u32,
            total_items: p.total_items(),
            current_page: p.current_page().map_or(-1, i64::from),
            has_more: p.has_more(),
            loading_initial: p.is_loading_initial(),
            loading_more: p.is_loading_more(),
            error_code,
            http_status,
        }
    }

    pub(crate) fn empty() -> Self {
        FfiListState {
            item_count: 0,
            total_items: 0,
            current_page: -1,
            has_more: false,
            loading_initial: false,
            loading_more: false,
            error_code: FfiErrorCode::NullArg,
            http_status: 0,
        }
    }
}
