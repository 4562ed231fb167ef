use axum::response::Html;

/// `GET /`: a minimal query console.
pub(crate) async fn handle_index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

pub(crate) const INDEX_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>sparql-proxy</title></head>
<body>
<h1>sparql-proxy</h1>
<form method="post" action="/sparql">
  <textarea name="query" rows="8" cols="80">SELECT * WHERE { ?s ?p ?o } LIMIT 10</textarea><br>
  <button type="submit">Run</button>
</form>
<p><a href="/admin">admin</a></p>
</body>
</html>
"#;

pub(crate) const ADMIN_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>sparql-proxy admin</title></head>
<body>
<h1>Queue</h1>
<button id="purge">Purge cache</button>
<pre id="state">connecting…</pre>
<script>
const ws = new WebSocket((location.protocol === "https:" ? "wss://" : "ws://") + location.host + "/live");
ws.onmessage = (event) => {
  const frame = JSON.parse(event.data);
  if (frame.type !== "state") return;
  document.getElementById("state").textContent = JSON.stringify(frame, null, 2);
};
document.getElementById("purge").onclick = () => ws.send(JSON.stringify({type: "purge_cache"}));
window.cancelJob = (id) => ws.send(JSON.stringify({type: "cancel_job", id}));
</script>
</body>
</html>
"#;
