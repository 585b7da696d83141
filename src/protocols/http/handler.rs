//! Request handler for the single served resource.

use super::parser::{Method, Request};
use super::response::{Response, Status};
use crate::storage::ResourceStore;
use tracing::{debug, warn};

/// Execute a request against the resource and build the response.
///
/// Resource access for the whole request happens inside one critical
/// section; methods that never touch the resource do not take it.
pub fn handle_request(request: &Request<'_>, store: &ResourceStore) -> Response {
    let response = match request.method {
        Method::Get => handle_get(store),
        Method::Put | Method::Post => handle_write(request, store),
        Method::Delete => handle_delete(store),
        Method::Other(_) => Response::new(Status::NotImplemented, "Method not implemented."),
    };

    debug!(
        method = request.method.as_str(),
        target = %request.target,
        version = %request.version,
        status = response.status.code(),
        "Handled request"
    );

    response
}

fn handle_get(store: &ResourceStore) -> Response {
    match store.lock().read() {
        Ok(Some(content)) => Response::new(Status::Ok, content),
        Ok(None) => Response::new(Status::NotFound, "Resource not found."),
        Err(e) => {
            warn!(error = %e, "Failed to read resource");
            Response::new(Status::InternalServerError, "Could not read resource.")
        }
    }
}

fn handle_write(request: &Request<'_>, store: &ResourceStore) -> Response {
    let body = match request.body {
        Some(body) => body,
        None => return Response::new(Status::BadRequest, "Missing body for PUT/POST."),
    };

    let (result, status) = if request.method == Method::Put {
        (store.lock().replace(body), Status::Created)
    } else {
        (store.lock().append(body), Status::Ok)
    };

    match result {
        Ok(()) => Response::new(status, "Resource updated."),
        Err(e) => {
            warn!(error = %e, method = request.method.as_str(), "Failed to write resource");
            Response::new(
                Status::InternalServerError,
                "Could not write to resource.",
            )
        }
    }
}

fn handle_delete(store: &ResourceStore) -> Response {
    match store.lock().remove() {
        Ok(true) => Response::empty(Status::NoContent),
        Ok(false) => Response::new(Status::NotFound, "Resource not found, cannot delete."),
        Err(e) => {
            warn!(error = %e, "Failed to remove resource");
            Response::new(Status::InternalServerError, "Could not delete resource.")
        }
    }
}
