use serde_json::{json, Value};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";

/// 冒烟测试：首页 -> 第一篇文章 -> 游客评论 -> 再次拉取评论树
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let client = reqwest::Client::new();
    println!("Starting blog smoke client against {}...", base_url);

    println!("\n[1/4] Fetching index...");
    let index: Value = client
        .get(format!("{}/api/articles", base_url))
        .send()
        .await?
        .json()
        .await?;
    let stats = &index["data"]["stats"];
    println!(
        "   -> {} article(s), {} user(s), {} visit(s) today",
        stats["article_total"], stats["user_total"], stats["today_visit_count"]
    );

    let Some(article_id) = index["data"]["articles"]["items"][0]["id"].as_i64() else {
        println!("   -> No published articles yet, nothing else to check.");
        return Ok(());
    };

    println!("\n[2/4] Opening article {}...", article_id);
    let detail_url = format!("{}/api/articles/{}", base_url, article_id);
    let detail: Value = client.get(&detail_url).send().await?.json().await?;
    println!(
        "   -> \"{}\" read {} time(s)",
        detail["data"]["article"]["title"].as_str().unwrap_or("?"),
        detail["data"]["article"]["read_count"]
    );

    println!("\n[3/4] Posting a guest comment...");
    let resp = client
        .post(format!("{}/comments", detail_url))
        .json(&json!({
            "content": "Hello from the smoke client!",
            "guest_name": "Ferris",
        }))
        .send()
        .await?;
    if resp.status().is_success() {
        println!("   -> Sent successfully!");
    } else {
        println!("   -> Failed to send: {}", resp.text().await?);
        return Ok(());
    }

    println!("\n[4/4] Fetching comment tree...");
    let detail: Value = client.get(&detail_url).send().await?.json().await?;
    let groups = detail["data"]["comments"].as_array().cloned().unwrap_or_default();
    println!("   -> {} thread(s):", groups.len());
    for group in groups {
        let root = &group["root"];
        println!(
            "      - [{}] {}: {}",
            root["create_time"].as_str().unwrap_or("?"),
            root["author_name"].as_str().unwrap_or("?"),
            root["content"].as_str().unwrap_or("")
        );
        for reply in group["replies"].as_array().into_iter().flatten() {
            println!(
                "          ↳ {} → {}: {}",
                reply["author_name"].as_str().unwrap_or("?"),
                reply["reply_to_name"].as_str().unwrap_or("?"),
                reply["content"].as_str().unwrap_or("")
            );
        }
    }

    Ok(())
}
