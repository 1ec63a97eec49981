//! One-shot local HTTP listener that catches the provider redirect.

mod handler;
mod server;
mod target;

pub use server::CallbackServer;

const SUCCESS_HTML: &str = r#"<!doctype html>
<html>
  <head><meta charset="utf-8" /><title>Twitch authorization complete</title></head>
  <body>
    <p>Signed in with Twitch. You may close this window.</p>
  </body>
</html>
"#;

const ERROR_HTML: &str = r#"<!doctype html>
<html>
  <head><meta charset="utf-8" /><title>Twitch authorization failed</title></head>
  <body>
    <p>Twitch did not return an authorization code. Close this window and try again.</p>
  </body>
</html>
"#;
