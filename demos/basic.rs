//! Basic example: login, whoami and logout with an encrypted cookie session

use salvo::prelude::*;
use salvo_secure_session::{
    generate_random_key, CookieOptions, CookieStore, SessionDepotExt, SessionHandler,
};

const SESSION: &str = "session";

#[handler]
async fn index(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let (session, _) = depot.session(req, SESSION);

    // Get current view count
    let views: i32 = session.get("views").unwrap_or(0);

    // Increment view count
    if let Err(e) = session.set("views", views + 1) {
        res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
        res.render(e.to_string());
        return;
    }

    if let Err(e) = depot.save_session(res, &session) {
        res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
        res.render(e.to_string());
        return;
    }
    res.render(format!("Hello! You have viewed this page {} time(s).", views + 1));
}

#[handler]
async fn get_user(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let (session, err) = depot.session(req, SESSION);

    // A rejected cookie looks exactly like a missing one
    if let Some(e) = err {
        tracing::info!("ignoring session cookie: {}", e);
    }

    match session.get::<String>("user") {
        Some(user) => res.render(format!("Logged in as: {}", user)),
        None => res.render(Redirect::found("/login?name=anonymous")),
    }
}

#[handler]
async fn set_user(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let (session, _) = depot.session(req, SESSION);

    // Get username from query parameter
    let username = req.query::<String>("name").unwrap_or_else(|| "anonymous".to_string());

    session.set("user", &username).expect("strings serialize");
    depot.save_session(res, &session).expect("session fits in a cookie");

    res.render(format!("User set to: {}", username));
}

#[handler]
async fn logout(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let (session, _) = depot.session(req, SESSION);

    // Tell the browser to drop the cookie
    session.clear();
    session.expire();
    depot.save_session(res, &session).expect("session fits in a cookie");

    res.render("Logged out successfully");
}

#[tokio::main]
async fn main() {
    // Set up logging
    tracing_subscriber::fmt::init();

    // Random keys: every restart invalidates existing cookies
    let hash_key = generate_random_key(32).expect("OS random source");
    let block_key = generate_random_key(32).expect("OS random source");

    let mut store = CookieStore::from_key_pairs(&[(hash_key.as_slice(), Some(block_key.as_slice()))])
        .expect("valid keys")
        .with_options(CookieOptions::new().with_http_only(true));
    store.set_max_age(3600); // 1 hour

    // Build router
    let router = Router::new()
        .hoop(SessionHandler::new(store))
        .get(index)
        .push(Router::with_path("user").get(get_user))
        .push(Router::with_path("login").get(set_user))
        .push(Router::with_path("logout").get(logout));

    // Start server
    let acceptor = TcpListener::new("127.0.0.1:5800").bind().await;
    println!("Server running at http://127.0.0.1:5800");
    println!("Try these endpoints:");
    println!("  GET /           - View counter");
    println!("  GET /user       - Get current user");
    println!("  GET /login?name=alice - Set user");
    println!("  GET /logout     - Delete the session cookie");

    Server::new(acceptor).serve(router).await;
}
