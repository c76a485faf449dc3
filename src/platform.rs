/*
 * Copyright (c) Huawei Technologies Co., Ltd. 2025. All rights reserved.
 * Global Trust Authority is licensed under the Mulan PSL v2.
 * You can use this software according to the terms and conditions of the Mulan PSL v2.
 * You may obtain a copy of Mulan PSL v2 at:
 *     http://license.coscl.org.cn/MulanPSL2
 * THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR
 * PURPOSE.
 * See the Mulan PSL v2 for more details.
 */

//! Determination of the Linux distribution and hardware platform string.

use std::fs;

use log::{debug, info};
use nix::sys::utsname::uname;

use crate::error::PtsError;

/// Linux/Unix distribution release info (from http://linuxmafia.com)
const RELEASE_FILES: [&str; 36] = [
    "/etc/lsb-release",
    "/etc/debian_version",
    "/etc/SuSE-release",
    "/etc/novell-release",
    "/etc/sles-release",
    "/etc/redhat-release",
    "/etc/fedora-release",
    "/etc/gentoo-release",
    "/etc/slackware-version",
    "/etc/annvix-release",
    "/etc/arch-release",
    "/etc/arklinux-release",
    "/etc/aurox-release",
    "/etc/blackcat-release",
    "/etc/cobalt-release",
    "/etc/conectiva-release",
    "/etc/debian_release",
    "/etc/immunix-release",
    "/etc/lfs-release",
    "/etc/linuxppc-release",
    "/etc/mandrake-release",
    "/etc/mandriva-release",
    "/etc/mandrakelinux-release",
    "/etc/mklinux-release",
    "/etc/pld-release",
    "/etc/redhat_version",
    "/etc/slackware-release",
    "/etc/e-smith-release",
    "/etc/release",
    "/etc/sun-release",
    "/etc/tinysofa-release",
    "/etc/turbolinux-release",
    "/etc/ultrapenguin-release",
    "/etc/UnitedLinux-release",
    "/etc/va-release",
    "/etc/yellowdog-release",
];

const RELEASE_LSB: usize = 0;
const RELEASE_DEBIAN: usize = 1;

const LSB_DESCRIPTION: &str = "DISTRIB_DESCRIPTION=\"";
const DEBIAN_PREFIX: &str = "Debian ";

/// Derive the platform string from the first matching distribution release
/// file, with the machine architecture appended space-separated.
///
/// The original C implementation appends the machine string with an
/// unbounded copy length; here the append grows the string and is
/// inherently bounded.
pub fn extract_platform_info() -> Result<String, PtsError> {
    for (index, release_file) in RELEASE_FILES.iter().enumerate() {
        let content = match fs::read_to_string(release_file) {
            Ok(content) => content,
            Err(_) => continue,
        };

        let description = match index {
            RELEASE_LSB => match parse_lsb_description(&content) {
                Some(value) => value.to_string(),
                None => {
                    debug!("failed to find lsb-release DESCRIPTION field");
                    return Err(PtsError::PlatformInfoUnavailable);
                }
            },
            RELEASE_DEBIAN => match parse_first_line(&content) {
                Some(line) => format!("{}{}", DEBIAN_PREFIX, line),
                None => {
                    debug!("failed to find end of release string");
                    return Err(PtsError::PlatformInfoUnavailable);
                }
            },
            _ => match parse_first_line(&content) {
                Some(line) => line.to_string(),
                None => {
                    debug!("failed to find end of release string");
                    return Err(PtsError::PlatformInfoUnavailable);
                }
            },
        };

        let machine = match uname() {
            Ok(info) => info.machine().to_string_lossy().into_owned(),
            Err(_) => {
                debug!("could not retrieve machine architecture");
                return Err(PtsError::PlatformInfoUnavailable);
            }
        };

        let platform = format!("{} {}", description, machine);
        info!("platform is '{}'", platform);
        return Ok(platform);
    }

    debug!("no distribution release file found");
    Err(PtsError::PlatformInfoUnavailable)
}

/// Value of the quoted DISTRIB_DESCRIPTION field of an lsb-release file
fn parse_lsb_description(content: &str) -> Option<&str> {
    let start = content.find(LSB_DESCRIPTION)? + LSB_DESCRIPTION.len();
    let rest = &content[start..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}

/// First newline-terminated line of a release file
fn parse_first_line(content: &str) -> Option<&str> {
    content.split_once('\n').map(|(line, _)| line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lsb_description_field() {
        let content = "DISTRIB_ID=Ubuntu\nDISTRIB_DESCRIPTION=\"Ubuntu 22.04.4 LTS\"\n";
        assert_eq!(parse_lsb_description(content), Some("Ubuntu 22.04.4 LTS"));
    }

    #[test]
    fn lsb_description_missing() {
        assert_eq!(parse_lsb_description("DISTRIB_ID=Ubuntu\n"), None);
        assert_eq!(parse_lsb_description("DISTRIB_DESCRIPTION=\"unterminated"), None);
    }

    #[test]
    fn first_line_requires_newline() {
        assert_eq!(parse_first_line("12.5\ntrailing"), Some("12.5"));
        assert_eq!(parse_first_line("no newline"), None);
    }
}
