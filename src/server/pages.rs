//! Static HTML served by the front end

pub const INDEX: &str = r#"<!doctype html>
<html>
<head><title>tabflow</title></head>
<body>
<h1>tabflow</h1>
<ul>
  <li><a href="/train">Train a new model</a></li>
  <li><a href="/predict">Predict</a></li>
  <li><a href="/health">Health</a></li>
</ul>
</body>
</html>
"#;

pub const PREDICT_FORM: &str = r#"<!doctype html>
<html>
<head><title>tabflow: predict</title></head>
<body>
<h1>Predict</h1>
<p>Paste one record as a JSON object, or several as an array.</p>
<form id="predict">
  <textarea name="records" rows="12" cols="80">{"Gender": "Male", "Age": 44, "Vehicle_Age": "> 2 Years", "Vehicle_Damage": "Yes", "Annual_Premium": 40454.0}</textarea>
  <br>
  <button type="submit">Predict</button>
</form>
<pre id="result"></pre>
<script>
document.getElementById("predict").addEventListener("submit", async (event) => {
  event.preventDefault();
  const body = event.target.records.value;
  const response = await fetch("/predict", {
    method: "POST",
    headers: {"Content-Type": "application/json"},
    body,
  });
  document.getElementById("result").textContent =
    JSON.stringify(await response.json(), null, 2);
});
</script>
</body>
</html>
"#;
