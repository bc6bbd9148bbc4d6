//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI 3 document of the REST API to `openapi.json`, or to the
//! path given as the first argument.

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

fn write_document(path: &str) -> Result<usize, Box<dyn std::error::Error>> {
    let doc = ApiDoc::openapi();
    std::fs::write(path, doc.to_pretty_json()?)?;
    Ok(doc.paths.paths.len())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "openapi.json".to_string());
    let routes = write_document(&path)?;
    println!("OpenAPI document with {} paths written to {}", routes, path);
    Ok(())
}
