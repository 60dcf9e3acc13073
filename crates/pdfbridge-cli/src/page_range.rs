/// Parse a page range like `"1,3-5,9-"` into sorted, deduplicated 0-based
/// page indices.
///
/// Pages are 1-based on input. A range with no end (`"9-"`) runs to the
/// last page.
pub fn parse_page_range(input: &str, page_count: usize) -> Result<Vec<usize>, String> {
    let mut pages = Vec::new();

    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (first, last) = match part.split_once('-') {
            Some((start, end)) => {
                let start = page_number(start, page_count)?;
                let end = if end.trim().is_empty() {
                    page_count
                } else {
                    page_number(end, page_count)?
                };
                if end < start {
                    return Err(format!("range {part} runs backwards"));
                }
                (start, end)
            }
            None => {
                let page = page_number(part, page_count)?;
                (page, page)
            }
        };
        pages.extend(first - 1..last);
    }

    pages.sort_unstable();
    pages.dedup();
    Ok(pages)
}

fn page_number(text: &str, page_count: usize) -> Result<usize, String> {
    let text = text.trim();
    let page: usize = text
        .parse()
        .map_err(|_| format!("invalid page number: '{text}'"))?;
    match page {
        0 => Err("page 0 is invalid (pages start at 1)".to_string()),
        p if p > page_count => Err(format!(
            "page {p} exceeds document page count ({page_count})"
        )),
        p => Ok(p),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singles_and_ranges() {
        assert_eq!(parse_page_range("3", 5).unwrap(), vec![2]);
        assert_eq!(parse_page_range("2-4", 5).unwrap(), vec![1, 2, 3]);
        assert_eq!(
            parse_page_range("1-3,7,10-12", 12).unwrap(),
            vec![0, 1, 2, 6, 9, 10, 11]
        );
    }

    #[test]
    fn open_range_runs_to_last_page() {
        assert_eq!(parse_page_range("4-", 6).unwrap(), vec![3, 4, 5]);
    }

    #[test]
    fn overlapping_parts_are_merged() {
        assert_eq!(parse_page_range("2,1-3,2", 5).unwrap(), vec![0, 1, 2]);
        assert_eq!(parse_page_range(" 1 , 3 - 5 ,", 5).unwrap(), vec![0, 2, 3, 4]);
    }

    #[test]
    fn bad_pages_are_rejected() {
        assert!(parse_page_range("0", 5).unwrap_err().contains("invalid"));
        assert!(parse_page_range("6", 5).unwrap_err().contains("exceeds"));
        assert!(parse_page_range("2-x", 5).unwrap_err().contains("'x'"));
        assert!(parse_page_range("4-2", 5).unwrap_err().contains("backwards"));
    }
}
