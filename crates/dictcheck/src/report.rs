//! Discrepancy report rendering.

use dictcheck_common::Discrepancy;
use std::io::{self, Write};

/// One report block, terminated by a `-----` separator line
pub fn render_discrepancy(discrepancy: &Discrepancy) -> String {
    format!(
        "Service: {}\nHostname: {}\nDictionary site ID: {}\nPDocs site ID:      {}\n-----\n",
        discrepancy.service_name,
        discrepancy.hostname,
        discrepancy.stored_site_id,
        discrepancy.expected_site_id
    )
}

/// Write every block to `out`. Nothing is written for an empty list.
pub fn write_report<W: Write>(out: &mut W, discrepancies: &[Discrepancy]) -> io::Result<()> {
    for discrepancy in discrepancies {
        out.write_all(render_discrepancy(discrepancy).as_bytes())?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Discrepancy {
        Discrepancy {
            service_name: "fe1".to_string(),
            hostname: "example.com".to_string(),
            stored_site_id: "site123".to_string(),
            expected_site_id: "siteXYZ".to_string(),
        }
    }

    #[test]
    fn test_block_format() {
        assert_eq!(
            render_discrepancy(&sample()),
            concat!(
                "Service: fe1\n",
                "Hostname: example.com\n",
                "Dictionary site ID: site123\n",
                "PDocs site ID:      siteXYZ\n",
                "-----\n",
            )
        );
    }

    #[test]
    fn test_empty_report_writes_nothing() {
        let mut out = Vec::new();
        write_report(&mut out, &[]).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_one_block_per_discrepancy() {
        let mut second = sample();
        second.hostname = "other.com".to_string();

        let mut out = Vec::new();
        write_report(&mut out, &[sample(), second]).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text.matches("-----\n").count(), 2);
        assert!(text.contains("Hostname: example.com\n"));
        assert!(text.contains("Hostname: other.com\n"));
    }
}
