//! Print the OpenAPI document as pretty JSON, for CI artefacts and client
//! code generation.

use utoipa::OpenApi;

use trendforge_backend::ApiDoc;

fn main() -> Result<(), serde_json::Error> {
    println!("{}", ApiDoc::openapi().to_pretty_json()?);
    Ok(())
}
