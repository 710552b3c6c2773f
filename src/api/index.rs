//! Index page served in gateway mode

use crate::config::BotConfig;
use crate::types::format_quantity;

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{{symbol}} Reward Bot</title>
</head>
<body>
  <h1>{{symbol}} Reward Bot</h1>
  <p>Paying account: <strong>{{account}}</strong></p>
  <p>Default reward: <strong>{{reward}} {{symbol}}</strong></p>
  <form id="distribute">
    <input name="recipient" placeholder="recipient" required>
    <input name="amount" type="number" step="any" placeholder="{{reward}}">
    <button type="submit">Send reward</button>
  </form>
  <pre id="result"></pre>
  <script>
    document.getElementById("distribute").addEventListener("submit", async (event) => {
      event.preventDefault();
      const form = new FormData(event.target);
      const body = { recipient: form.get("recipient") };
      if (form.get("amount")) body.amount = Number(form.get("amount"));
      const response = await fetch("/distribute", {
        method: "POST",
        headers: { "Content-Type": "application/json" },
        body: JSON.stringify(body),
      });
      document.getElementById("result").textContent = await response.text();
    });
  </script>
</body>
</html>
"#;

/// Render the page for the configured account
pub fn render(config: &BotConfig) -> String {
    TEMPLATE
        .replace("{{account}}", &escape(&config.account_name))
        .replace("{{symbol}}", &escape(&config.token_symbol))
        .replace(
            "{{reward}}",
            &format_quantity(config.reward_amount, config.token_precision),
        )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
