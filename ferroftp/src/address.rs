//! # Address
//!
//! Payload codecs for PASV, PORT, PWD, SIZE and MDTM

use std::net::{Ipv4Addr, SocketAddrV4};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::regex::{MDTM_RE, PASV_ADDR_RE};
use crate::{FtpError, FtpResult};

/// Parse the address from a PASV reply: `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)`
pub fn parse_pasv(reply: &str) -> FtpResult<SocketAddrV4> {
    let caps = PASV_ADDR_RE
        .captures(reply)
        .ok_or_else(|| FtpError::BadResponse(format!("no address in PASV reply: {reply}")))?;
    let fields = caps[1]
        .split(',')
        .map(|f| f.trim().parse::<u8>())
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|e| FtpError::BadResponse(format!("bad PASV address field: {e}")))?;
    let [h1, h2, h3, h4, p1, p2] = fields[..] else {
        return Err(FtpError::BadResponse(format!(
            "PASV address has {} fields, expected 6",
            fields.len()
        )));
    };
    let port = u16::from(p1) * 256 + u16::from(p2);

    Ok(SocketAddrV4::new(Ipv4Addr::new(h1, h2, h3, h4), port))
}

/// Format the PORT argument for `ip`: `h1,h2,h3,h4,n1,n2`
pub fn format_port(ip: Ipv4Addr, n1: u8, n2: u8) -> String {
    format!("{},{n1},{n2}", ip.to_string().replace('.', ","))
}

/// Extract the path quoted in a PWD (or MKD) reply
pub fn parse_pwd(reply: &str) -> FtpResult<String> {
    match (reply.find('"'), reply.rfind('"')) {
        (Some(begin), Some(end)) if begin < end => Ok(reply[begin + 1..end].to_string()),
        _ => Err(FtpError::BadResponse(format!(
            "no quoted path in reply: {reply}"
        ))),
    }
}

/// Parse the file size returned by SIZE
pub fn parse_size(reply: &str) -> FtpResult<u64> {
    reply
        .trim()
        .parse::<u64>()
        .map_err(|e| FtpError::BadResponse(format!("bad SIZE payload {reply:?}: {e}")))
}

/// Parse the timestamp returned by MDTM: `YYYYMMDDhhmmss[.sss]`, always UTC.
/// The fractional part is optional and defaults to zero.
pub fn parse_date(reply: &str) -> FtpResult<DateTime<Utc>> {
    let caps = MDTM_RE
        .captures(reply)
        .ok_or_else(|| FtpError::BadResponse(format!("bad MDTM payload: {reply}")))?;
    let field = |i: usize| caps[i].parse::<u32>().unwrap_or_default();
    let nanos = caps
        .get(7)
        .map(|frac| {
            let digits = format!("{:0<9}", frac.as_str());
            digits.parse::<u32>().unwrap_or_default()
        })
        .unwrap_or_default();
    let datetime = NaiveDate::from_ymd_opt(field(1) as i32, field(2), field(3))
        .and_then(|date| date.and_hms_nano_opt(field(4), field(5), field(6), nanos))
        .ok_or_else(|| FtpError::BadResponse(format!("invalid date in MDTM payload: {reply}")))?;

    Ok(Utc.from_utc_datetime(&datetime))
}
