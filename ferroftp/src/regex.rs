//! # FTP Regex
//!
//! Regular expressions to parse FTP replies

use lazy_regex::{Lazy, Regex};

/// This regex extracts the parenthesized address list from a PASV reply.
/// The number of fields is validated by the caller.
pub static PASV_ADDR_RE: Lazy<Regex> = lazy_regex!(r"\(([^)]*)\)");

/// This regex extracts modification time from MDTM reply: `YYYYMMDDhhmmss[.sss]`
pub static MDTM_RE: Lazy<Regex> =
    lazy_regex!(r"\b(\d{4})(\d{2})(\d{2})(\d{2})(\d{2})(\d{2})(?:\.(\d{1,9}))?\b");

#[cfg(test)]
mod test {

    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn should_match_pasv_address() {
        let response = "227 Entering Passive Mode (213,229,112,130,216,4)";
        let caps = PASV_ADDR_RE.captures(response).unwrap();
        assert_eq!(&caps[1], "213,229,112,130,216,4");
    }

    #[test]
    fn should_match_mdtm() {
        let response = "213 20230201111632.250";
        let caps = MDTM_RE.captures(response).unwrap();
        let year = caps[1].parse::<i32>().unwrap();
        let month = caps[2].parse::<u32>().unwrap();
        let day = caps[3].parse::<u32>().unwrap();
        let hour = caps[4].parse::<u32>().unwrap();
        let minute = caps[5].parse::<u32>().unwrap();
        let seconds = caps[6].parse::<u32>().unwrap();
        assert_eq!(year, 2023);
        assert_eq!(month, 2);
        assert_eq!(day, 1);
        assert_eq!(hour, 11);
        assert_eq!(minute, 16);
        assert_eq!(seconds, 32);
        assert_eq!(&caps[7], "250");
    }

    #[test]
    fn should_not_match_short_mdtm() {
        assert!(MDTM_RE.captures("213 202302011116").is_none());
    }
}
