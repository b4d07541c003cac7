//! RC4 stream cipher.
//!
//! Revisions 2 and 3 encipher every string and stream with RC4, and revision
//! 4 still routes through it when the crypt filter method is V2. It survives
//! here for interoperability with legacy documents only.
//!
//! PDF Spec: Section 7.6.2 - General Encryption Algorithm
//!
//! State is built per call: scheduling the permutation and draining the
//! keystream both consume it, so a spent cipher can never be resumed by
//! accident.

/// The 256-byte permutation plus the two stream counters.
struct Rc4State {
    perm: [u8; 256],
    x: u8,
    y: u8,
}

impl Rc4State {
    /// Schedule `key` into a fresh permutation. PDF keys run 5-16 bytes.
    fn schedule(key: &[u8]) -> Self {
        let mut perm = [0u8; 256];
        for (i, slot) in perm.iter_mut().enumerate() {
            *slot = i as u8;
        }

        let mut j = 0u8;
        for i in 0..256 {
            j = j.wrapping_add(perm[i]).wrapping_add(key[i % key.len()]);
            perm.swap(i, j as usize);
        }

        Self { perm, x: 0, y: 0 }
    }

    /// XOR the keystream over `buf`, consuming that much of the stream.
    fn process(&mut self, buf: &mut [u8]) {
        for byte in buf.iter_mut() {
            self.x = self.x.wrapping_add(1);
            self.y = self.y.wrapping_add(self.perm[self.x as usize]);
            self.perm.swap(self.x as usize, self.y as usize);
            let idx = self.perm[self.x as usize].wrapping_add(self.perm[self.y as usize]);
            *byte ^= self.perm[idx as usize];
        }
    }
}

/// Apply RC4 under `key`.
///
/// One call enciphers; a second call with the same key restores the original
/// bytes, so there is no separate decrypt entry point.
pub fn rc4_crypt(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    Rc4State::schedule(key).process(&mut out);
    out
}
