//! Minimal senda example: two competing `/` routes, a JSON echo and a
//! failing handler.
//!
//! Run with:
//!   RUST_LOG=info DEBUG=1 PORT=3000 cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/                  → {"una":"otra cosa"}
//!   curl 'http://localhost:3000/search?q=a&q=b'  → b
//!   curl -X POST http://localhost:3000/notes -d '{"text":"hola"}'
//!   curl -X DELETE http://localhost:3000/notes   → 200, empty body
//!   curl -i http://localhost:3000/broken         → 500

use serde::{Deserialize, Serialize};
use serde_json::json;
use senda::{Config, Error, Reply, Request, Server};
use tracing_subscriber::EnvFilter;

#[derive(Deserialize, Serialize)]
struct Note {
    text: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    let server = Server::new();
    server.set_debug(config.debug);

    // The second registration shadows the first.
    server
        .get("/", |_req: Request| async { Reply::new(200, json!({ "una": "vaina" })) })?
        .get("/", |_req: Request| async { Reply::new(200, json!({ "una": "otra cosa" })) })?
        .get("/search", search)?
        .post("/notes", create_note)?
        .delete("/notes", |_req: Request| async {})?
        .get("/broken", broken)?;

    server.bind(config.addr()).await?.serve().await
}

// GET /search?q=… → the last `q` value, as text
async fn search(req: Request) -> Reply {
    Reply::ok(req.query_param("q").unwrap_or_default().to_owned())
}

// POST /notes → 201 with the note echoed back, or 400 on a malformed body
async fn create_note(req: Request) -> Reply {
    match req.json::<Note>() {
        Ok(note) => Reply::json(201, &note).unwrap_or_else(|_| Reply::status(500)),
        Err(e) => Reply::new(400, json!({ "error": e.to_string() })),
    }
}

// GET /broken → 500; the error is logged, not sent
async fn broken(_req: Request) -> Result<Reply, String> {
    Err("this handler always fails".to_owned())
}
