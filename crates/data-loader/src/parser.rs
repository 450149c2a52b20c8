//! Parser for the exported data files.
//!
//! - behaviors.dat: userId::productId::behaviorType::unixSeconds
//! - products.dat: id::name::price::categoryId::stock::unixSeconds::imageUrl|imageUrl
//!
//! `categoryId` and the image list may be empty. Blank lines and lines
//! starting with `#` are skipped.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::str::Split;

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DataLoadError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => DataLoadError::Io(e),
    })?;
    Ok(content.lines().map(|s| s.to_string()).collect())
}

/// Pull the next `::`-separated field or report which one is missing
fn next_field<'a>(
    parts: &mut Split<'a, &'static str>,
    file: &str,
    line: usize,
    name: &str,
) -> Result<&'a str> {
    parts.next().ok_or_else(|| DataLoadError::MalformedLine {
        file: file.to_string(),
        line,
        reason: format!("Missing {}", name),
    })
}

fn parse_number<T>(value: &str, file: &str, line: usize, name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| DataLoadError::MalformedLine {
        file: file.to_string(),
        line,
        reason: format!("Invalid {}: {}", name, e),
    })
}

fn parse_timestamp(value: &str, file: &str, line: usize) -> Result<DateTime<Utc>> {
    let secs: i64 = parse_number(value, file, line, "timestamp")?;
    DateTime::<Utc>::from_timestamp(secs, 0).ok_or_else(|| DataLoadError::InvalidField {
        field: "timestamp",
        value: value.to_string(),
    })
}

/// Parse the behaviors.dat file, stamping each event's weight from `weights`
pub fn parse_behaviors(path: &Path, weights: &BehaviorWeights) -> Result<Vec<BehaviorEvent>> {
    const FILE: &str = "behaviors.dat";
    let lines = read_lines(path)?;
    let mut events = Vec::with_capacity(lines.len());

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let line_trimmed = line.trim();
        if line_trimmed.is_empty() || line_trimmed.starts_with('#') {
            continue;
        }

        let mut parts = line_trimmed.split("::");
        let user_id = next_field(&mut parts, FILE, line_no, "userId")?;
        let product_id = next_field(&mut parts, FILE, line_no, "productId")?;
        let behavior = next_field(&mut parts, FILE, line_no, "behaviorType")?;
        let timestamp = next_field(&mut parts, FILE, line_no, "timestamp")?;

        let behavior_type = parse_behavior_type(behavior, line_no)?;
        events.push(BehaviorEvent::new(
            parse_number(user_id, FILE, line_no, "userId")?,
            parse_number(product_id, FILE, line_no, "productId")?,
            behavior_type,
            parse_timestamp(timestamp, FILE, line_no)?,
            weights,
        ));
    }

    Ok(events)
}

/// Parse the products.dat file
pub fn parse_products(path: &Path) -> Result<Vec<Product>> {
    const FILE: &str = "products.dat";
    let lines = read_lines(path)?;
    let mut products = Vec::with_capacity(lines.len());

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let line_trimmed = line.trim();
        if line_trimmed.is_empty() || line_trimmed.starts_with('#') {
            continue;
        }

        let mut parts = line_trimmed.split("::");
        let id = next_field(&mut parts, FILE, line_no, "id")?;
        let name = next_field(&mut parts, FILE, line_no, "name")?;
        let price = next_field(&mut parts, FILE, line_no, "price")?;
        let category = next_field(&mut parts, FILE, line_no, "categoryId")?;
        let stock = next_field(&mut parts, FILE, line_no, "stock")?;
        let created_at = next_field(&mut parts, FILE, line_no, "createdAt")?;
        // Image list is optional at the end of the line
        let images = parts.next().unwrap_or("");

        let category_id = if category.trim().is_empty() {
            None
        } else {
            Some(parse_number(category, FILE, line_no, "categoryId")?)
        };

        products.push(Product {
            id: parse_number(id, FILE, line_no, "id")?,
            name: name.to_string(),
            price: parse_number(price, FILE, line_no, "price")?,
            category_id,
            image_urls: parse_image_urls(images),
            stock: parse_number(stock, FILE, line_no, "stock")?,
            created_at: parse_timestamp(created_at, FILE, line_no)?,
        });
    }

    Ok(products)
}

fn parse_behavior_type(s: &str, line: usize) -> Result<BehaviorType> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(DataLoadError::MalformedLine {
            file: "behaviors.dat".to_string(),
            line,
            reason: "Empty behaviorType".to_string(),
        });
    }
    Ok(BehaviorType::from(trimmed.to_string()))
}

/// Split a pipe-separated image list, dropping empty entries
fn parse_image_urls(s: &str) -> Vec<String> {
    s.split('|')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "data-loader-{}-{}",
            std::process::id(),
            name
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_parse_behavior_type() {
        assert_eq!(parse_behavior_type("add_cart", 1).unwrap(), BehaviorType::AddCart);
        assert_eq!(
            parse_behavior_type("wishlist", 1).unwrap(),
            BehaviorType::Other("wishlist".to_string())
        );
        assert!(parse_behavior_type("  ", 1).is_err());
    }

    #[test]
    fn test_parse_image_urls() {
        assert_eq!(
            parse_image_urls("a.jpg| b.jpg ||"),
            vec!["a.jpg".to_string(), "b.jpg".to_string()]
        );
        assert!(parse_image_urls("").is_empty());
    }

    #[test]
    fn test_parse_behaviors_stamps_weights() {
        let path = write_temp(
            "behaviors.dat",
            "# header\n1::10::purchase::1700000000\n\n2::11::poke::1700000001\n",
        );
        let events = parse_behaviors(&path, &BehaviorWeights::default()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].user_id, 1);
        assert_eq!(events[0].product_id, 10);
        assert_eq!(events[0].weight, 10.0);
        assert_eq!(events[0].timestamp.timestamp(), 1_700_000_000);
        assert_eq!(events[1].weight, 1.0);
    }

    #[test]
    fn test_parse_behaviors_reports_line() {
        let path = write_temp("bad-behaviors.dat", "1::10::view::1\n1::x::view::2\n");
        let err = parse_behaviors(&path, &BehaviorWeights::default()).unwrap_err();
        std::fs::remove_file(&path).ok();

        match err {
            DataLoadError::MalformedLine { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_products() {
        let path = write_temp(
            "products.dat",
            concat!(
                "1::Salmon::128.5::3::20::1700000000::salmon.jpg|salmon2.jpg\n",
                "2::Mystery box::45::::0::1700000100\n",
            ),
        );
        let products = parse_products(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].name, "Salmon");
        assert_eq!(products[0].price, 128.5);
        assert_eq!(products[0].category_id, Some(3));
        assert_eq!(products[0].primary_image(), Some("salmon.jpg"));
        assert_eq!(products[1].category_id, None);
        assert!(products[1].image_urls.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let err = parse_products(Path::new("/definitely/not/here/products.dat")).unwrap_err();
        assert!(matches!(err, DataLoadError::FileNotFound { .. }));
    }
}
