//! Minimal HTTP/1.1 server exposing the lending engine.
//!
//! One connection is served at a time, `Connection: close` per request; the
//! engine behind it is shared and thread-safe, so multiple server loops can
//! be pointed at the same engine if needed. JSON in, JSON out, with the
//! error taxonomy mapped onto status codes: unknown item 404, conflicting
//! transition or bad input 400, backend failure 500 (without leaking
//! backend internals into the response body).

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use brolly::engine::{BorrowRequest, LendingEngine};
use brolly_core::{
    error::LendingError,
    traits::LendingStore,
    types::{ItemNumber, Location},
};

#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub bind: SocketAddr,
}

#[derive(Debug, Error)]
pub enum HttpServeError {
    #[error("bind failed: {0}")]
    Bind(std::io::Error),
    #[error("accept failed: {0}")]
    Accept(std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct HttpResponse {
    status: u16,
    body: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    ListItems,
    GetItem(ItemNumber),
    CreateItem,
    Borrow(ItemNumber),
    Return(ItemNumber),
    Initialize,
    ListActivities,
    Reset,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
enum RequestError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
}

struct HttpRequest {
    method: String,
    target: String,
    body: Vec<u8>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateItemBody {
    item_number: ItemNumber,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BorrowBody {
    borrower: String,
    borrower_contact: String,
    borrow_location: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReturnBody {
    return_location: String,
}

/// Bind and serve until the process is stopped.
pub fn serve(
    config: HttpServerConfig,
    engine: Arc<LendingEngine<dyn LendingStore>>,
) -> Result<(), HttpServeError> {
    let listener = TcpListener::bind(config.bind).map_err(HttpServeError::Bind)?;
    tracing::info!(bind = %config.bind, "listening");
    serve_on(listener, engine, None)
}

/// Serve an already-bound listener, optionally stopping after
/// `max_requests` connections. The bounded variant is what tests and demos
/// use: bind to an ephemeral port, serve a known number of requests, join.
pub fn serve_on(
    listener: TcpListener,
    engine: Arc<LendingEngine<dyn LendingStore>>,
    max_requests: Option<usize>,
) -> Result<(), HttpServeError> {
    let mut served = 0usize;

    for stream in listener.incoming() {
        match stream {
            Ok(mut stream) => {
                if let Err(err) = handle_connection(&mut stream, &engine) {
                    let _ = write_json_response(
                        &mut stream,
                        HttpResponse {
                            status: 500,
                            body: json!({ "error": format!("internal server error: {err}") }),
                        },
                    );
                }
                served += 1;
            }
            Err(err) => return Err(HttpServeError::Accept(err)),
        }

        // Checked after handling so the loop is not left blocked in accept
        // once the last allowed request has been served.
        if let Some(limit) = max_requests {
            if served >= limit {
                break;
            }
        }
    }

    Ok(())
}

fn handle_connection(
    stream: &mut TcpStream,
    engine: &LendingEngine<dyn LendingStore>,
) -> Result<(), String> {
    let request = match read_request(stream) {
        Ok(request) => request,
        Err(err) => {
            return write_json_response(stream, request_error_response(err))
                .map_err(|e| e.to_string());
        }
    };

    if request.method != "GET" && request.method != "POST" {
        return write_json_response(
            stream,
            HttpResponse {
                status: 405,
                body: json!({ "error": "method not allowed; use GET or POST" }),
            },
        )
        .map_err(|e| e.to_string());
    }

    let response = match parse_route(&request.method, &request.target) {
        Ok(route) => execute_route(engine, route, &request.body),
        Err(err) => request_error_response(err),
    };

    tracing::debug!(
        method = %request.method,
        target = %request.target,
        status = response.status,
        "request"
    );
    write_json_response(stream, response).map_err(|e| e.to_string())
}

fn request_error_response(err: RequestError) -> HttpResponse {
    match err {
        RequestError::BadRequest(msg) => HttpResponse {
            status: 400,
            body: json!({ "error": msg }),
        },
        RequestError::NotFound(msg) => HttpResponse {
            status: 404,
            body: json!({ "error": msg }),
        },
    }
}

fn read_request(stream: &mut TcpStream) -> Result<HttpRequest, RequestError> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    let header_end = loop {
        let n = stream
            .read(&mut chunk)
            .map_err(|e| RequestError::BadRequest(format!("failed to read request: {e}")))?;
        if n == 0 {
            return Err(RequestError::BadRequest("truncated request".to_string()));
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_subsequence(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        if buf.len() > 64 * 1024 {
            return Err(RequestError::BadRequest("request headers too large".to_string()));
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.lines();
    let request_line = lines
        .next()
        .ok_or_else(|| RequestError::BadRequest("missing request line".to_string()))?;
    let (method, target) = parse_request_line(request_line)?;

    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .map(|(_, value)| {
            value.trim().parse::<usize>().map_err(|_| {
                RequestError::BadRequest("invalid content-length header".to_string())
            })
        })
        .transpose()?
        .unwrap_or(0);

    let mut body = buf[header_end..].to_vec();
    while body.len() < content_length {
        let n = stream
            .read(&mut chunk)
            .map_err(|e| RequestError::BadRequest(format!("failed to read body: {e}")))?;
        if n == 0 {
            return Err(RequestError::BadRequest("truncated request body".to_string()));
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    Ok(HttpRequest {
        method,
        target,
        body,
    })
}

fn parse_request_line(line: &str) -> Result<(String, String), RequestError> {
    let mut parts = line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| RequestError::BadRequest("missing method".to_string()))?;
    let target = parts
        .next()
        .ok_or_else(|| RequestError::BadRequest("missing target".to_string()))?;
    Ok((method.to_string(), target.to_string()))
}

fn parse_route(method: &str, target: &str) -> Result<Route, RequestError> {
    let path = target.split_once('?').map(|(p, _)| p).unwrap_or(target);
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match (method, segments.as_slice()) {
        ("GET", ["items"]) => Ok(Route::ListItems),
        ("POST", ["items"]) => Ok(Route::CreateItem),
        ("POST", ["items", "initialize"]) => Ok(Route::Initialize),
        ("GET", ["items", number]) => parse_item_number(number).map(Route::GetItem),
        ("POST", ["items", number, "borrow"]) => parse_item_number(number).map(Route::Borrow),
        ("POST", ["items", number, "return"]) => parse_item_number(number).map(Route::Return),
        ("GET", ["activities"]) => Ok(Route::ListActivities),
        ("POST", ["reset"]) => Ok(Route::Reset),
        _ => Err(RequestError::NotFound(format!("unknown route: {path}"))),
    }
}

fn parse_item_number(raw: &str) -> Result<ItemNumber, RequestError> {
    raw.parse()
        .map_err(|_| RequestError::BadRequest(format!("invalid item number {raw:?}")))
}

fn execute_route(
    engine: &LendingEngine<dyn LendingStore>,
    route: Route,
    body: &[u8],
) -> HttpResponse {
    match route {
        Route::ListItems => match engine.items() {
            Ok(items) => ok_json(200, &items),
            Err(err) => error_response(&err),
        },
        Route::GetItem(number) => match engine.item(number) {
            Ok(item) => ok_json(200, &item),
            Err(err) => error_response(&err),
        },
        Route::CreateItem => {
            let parsed: CreateItemBody = match parse_body(body) {
                Ok(parsed) => parsed,
                Err(response) => return response,
            };
            match engine.create_item(parsed.item_number) {
                Ok(item) => ok_json(201, &item),
                Err(err) => error_response(&err),
            }
        }
        Route::Borrow(number) => {
            let parsed: BorrowBody = match parse_body(body) {
                Ok(parsed) => parsed,
                Err(response) => return response,
            };
            let location: Location = match parsed.borrow_location.parse() {
                Ok(location) => location,
                Err(err) => return error_response(&err),
            };
            let request = BorrowRequest {
                borrower: parsed.borrower,
                contact: parsed.borrower_contact,
                location,
            };
            match engine.borrow(number, request) {
                Ok(item) => ok_json(200, &item),
                Err(err) => error_response(&err),
            }
        }
        Route::Return(number) => {
            let parsed: ReturnBody = match parse_body(body) {
                Ok(parsed) => parsed,
                Err(response) => return response,
            };
            let location: Location = match parsed.return_location.parse() {
                Ok(location) => location,
                Err(err) => return error_response(&err),
            };
            match engine.return_item(number, location) {
                Ok(item) => ok_json(200, &item),
                Err(err) => error_response(&err),
            }
        }
        Route::Initialize => match engine.initialize() {
            Ok(()) => HttpResponse {
                status: 200,
                body: json!({
                    "success": true,
                    "message": format!("all {} items initialized", engine.config().pool_size),
                }),
            },
            Err(err) => error_response(&err),
        },
        Route::ListActivities => match engine.activities() {
            Ok(activities) => ok_json(200, &activities),
            Err(err) => error_response(&err),
        },
        Route::Reset => match engine.reset() {
            Ok(()) => HttpResponse {
                status: 200,
                body: json!({ "success": true, "message": "pool reset" }),
            },
            Err(err) => error_response(&err),
        },
    }
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, HttpResponse> {
    serde_json::from_slice(body).map_err(|err| HttpResponse {
        status: 400,
        body: json!({ "error": format!("invalid request body: {err}") }),
    })
}

fn ok_json<T: Serialize>(status: u16, value: &T) -> HttpResponse {
    match serde_json::to_value(value) {
        Ok(body) => HttpResponse { status, body },
        Err(err) => {
            tracing::error!(error = %err, "response serialization failed");
            HttpResponse {
                status: 500,
                body: json!({ "error": "internal server error" }),
            }
        }
    }
}

fn error_response(err: &LendingError) -> HttpResponse {
    match err {
        LendingError::NotFound(_) => HttpResponse {
            status: 404,
            body: json!({ "error": err.to_string() }),
        },
        LendingError::Conflict(_) | LendingError::InvalidInput(_) => HttpResponse {
            status: 400,
            body: json!({ "error": err.to_string() }),
        },
        LendingError::BackendUnavailable(detail) => {
            tracing::error!(detail = %detail, "backend failure");
            HttpResponse {
                status: 500,
                body: json!({ "error": "backend unavailable" }),
            }
        }
    }
}

fn write_json_response(stream: &mut TcpStream, response: HttpResponse) -> std::io::Result<()> {
    let body = serde_json::to_vec_pretty(&response.body)?;
    let status_text = reason_phrase(response.status);
    let header = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nAccess-Control-Allow-Origin: *\r\nAccess-Control-Allow-Methods: GET, POST\r\nConnection: close\r\n\r\n",
        response.status,
        status_text,
        body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(&body)?;
    stream.flush()
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
