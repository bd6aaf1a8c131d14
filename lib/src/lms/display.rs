// Human-readable dumps of keys and signatures

use std::fmt;

use crate::lms::hss::{HssPrivateKey, HssPublicKey, HssSignature};
use crate::lms::lmots::{LmotsPrivateKey, LmotsPublicKey, LmotsSignature};
use crate::lms::tree::{LmsPrivateKey, LmsPublicKey, LmsSignature};

const LABEL_WIDTH: usize = 10;
const HEX_BYTES_PER_LINE: usize = 16;

fn field(f: &mut fmt::Formatter<'_>, label: &str, value: impl fmt::Display) -> fmt::Result {
    writeln!(f, "{label:<LABEL_WIDTH$}: {value}")
}

fn word(f: &mut fmt::Formatter<'_>, label: &str, value: u32) -> fmt::Result {
    field(f, label, format_args!("{value:08x}"))
}

/// Hex value wrapped at 16 bytes, continuation lines aligned under the first
fn hex_field(f: &mut fmt::Formatter<'_>, label: &str, bytes: &[u8]) -> fmt::Result {
    if bytes.is_empty() {
        return field(f, label, "");
    }
    for (i, chunk) in bytes.chunks(HEX_BYTES_PER_LINE).enumerate() {
        if i == 0 {
            field(f, label, hex::encode(chunk))?;
        } else {
            writeln!(f, "{:width$}{}", "", hex::encode(chunk), width = LABEL_WIDTH + 2)?;
        }
    }
    Ok(())
}

fn separator(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f, "--------------------------------------------")?;
    writeln!(f, "{title}")?;
    writeln!(f, "--------------------------------------------")
}

impl fmt::Display for LmotsPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        word(f, "LMOTS type", self.algorithm().type_id())?;
        hex_field(f, "I", self.id())?;
        word(f, "q", self.q())?;
        field(f, "used", self.is_used())
    }
}

impl fmt::Display for LmotsPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        word(f, "LMOTS type", self.algorithm().type_id())?;
        hex_field(f, "I", self.id())?;
        word(f, "q", self.q())?;
        hex_field(f, "K", self.k())
    }
}

impl fmt::Display for LmotsSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        word(f, "LMOTS type", self.algorithm().type_id())?;
        hex_field(f, "C", self.randomizer())?;
        for i in 0..self.algorithm().params().p {
            hex_field(f, &format!("y[{i}]"), self.chain(i))?;
        }
        Ok(())
    }
}

impl fmt::Display for LmsPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        word(f, "LMS type", self.lms().type_id())?;
        word(f, "LMOTS type", self.lmots().type_id())?;
        hex_field(f, "I", self.id())?;
        word(f, "q", self.q())
    }
}

impl fmt::Display for LmsPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        word(f, "LMS type", self.lms().type_id())?;
        word(f, "LMOTS type", self.lmots().type_id())?;
        hex_field(f, "I", self.id())?;
        hex_field(f, "K", self.k())
    }
}

impl fmt::Display for LmsSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        word(f, "q", self.q())?;
        write!(f, "{}", self.lmots_signature())?;
        word(f, "LMS type", self.lms().type_id())?;
        for i in 0..self.lms().params().h as usize {
            hex_field(f, &format!("path[{i}]"), self.path_node(i))?;
        }
        Ok(())
    }
}

impl fmt::Display for HssPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        field(f, "levels", self.levels())?;
        for (i, key) in self.level_keys().iter().enumerate() {
            separator(f, &format!("LMS private key, level {i}"))?;
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

impl fmt::Display for HssPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        field(f, "levels", self.levels())?;
        write!(f, "{}", self.root())
    }
}

impl fmt::Display for HssSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        word(f, "Nspk", self.links().len() as u32)?;
        for (i, (sig, public)) in self.links().iter().enumerate() {
            separator(f, &format!("LMS signature, level {i}"))?;
            write!(f, "{sig}")?;
            separator(f, &format!("LMS public key, level {}", i + 1))?;
            write!(f, "{public}")?;
        }
        separator(f, &format!("LMS signature, level {}", self.links().len()))?;
        write!(f, "{}", self.bottom())
    }
}
