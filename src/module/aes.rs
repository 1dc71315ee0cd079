use aes::cipher::{AsyncStreamCipher, KeyIvInit};
use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use clap::{App, Arg, ArgMatches};

use super::Module;
use crate::error::{Error, Result};

const IV_SIZE: usize = 16;

/// AES-CFB encrypts or decrypts every buffer that passes through.
///
/// Each encrypted buffer is self contained: a fresh random IV followed
/// by the ciphertext, so that buffers survive reordering substrates
/// independently of each other.
pub struct Aes {
    key: Vec<u8>,
    encrypt: bool,
}

impl Aes {
    pub fn new() -> Self {
        Aes {
            key: Vec::new(),
            encrypt: true,
        }
    }
}

impl Default for Aes {
    fn default() -> Self {
        Aes::new()
    }
}

fn encrypt_in_place(key: &[u8], iv: &[u8; IV_SIZE], data: &mut [u8]) -> Result<()> {
    match key.len() {
        16 => cfb_mode::Encryptor::<aes::Aes128>::new_from_slices(key, iv)
            .map_err(|_| Error::ErrAesKeySize)?
            .encrypt(data),
        24 => cfb_mode::Encryptor::<aes::Aes192>::new_from_slices(key, iv)
            .map_err(|_| Error::ErrAesKeySize)?
            .encrypt(data),
        32 => cfb_mode::Encryptor::<aes::Aes256>::new_from_slices(key, iv)
            .map_err(|_| Error::ErrAesKeySize)?
            .encrypt(data),
        _ => return Err(Error::ErrAesKeySize),
    }
    Ok(())
}

fn decrypt_in_place(key: &[u8], iv: &[u8; IV_SIZE], data: &mut [u8]) -> Result<()> {
    match key.len() {
        16 => cfb_mode::Decryptor::<aes::Aes128>::new_from_slices(key, iv)
            .map_err(|_| Error::ErrAesKeySize)?
            .decrypt(data),
        24 => cfb_mode::Decryptor::<aes::Aes192>::new_from_slices(key, iv)
            .map_err(|_| Error::ErrAesKeySize)?
            .decrypt(data),
        32 => cfb_mode::Decryptor::<aes::Aes256>::new_from_slices(key, iv)
            .map_err(|_| Error::ErrAesKeySize)?
            .decrypt(data),
        _ => return Err(Error::ErrAesKeySize),
    }
    Ok(())
}

#[async_trait]
impl Module for Aes {
    fn name(&self) -> &'static str {
        "aes"
    }

    fn description(&self) -> &'static str {
        "Read from input, encrypt or decrypt in AES and write to output ( use --aes-key and --aes-mode arguments )."
    }

    fn register<'a>(&self, app: App<'a>) -> App<'a> {
        app.arg(
            Arg::new("aes-key")
                .long("aes-key")
                .takes_value(true)
                .help("AES key of 16, 24 or 32 bytes."),
        )
        .arg(
            Arg::new("aes-mode")
                .long("aes-mode")
                .takes_value(true)
                .default_value("encrypt")
                .help("AES mode, can be 'encrypt' or 'decrypt'."),
        )
    }

    fn setup(&mut self, matches: &ArgMatches) -> Result<()> {
        let key = matches.value_of("aes-key").ok_or(Error::ErrAesNoKey)?;
        if key.is_empty() {
            return Err(Error::ErrAesNoKey);
        }
        if !matches!(key.len(), 16 | 24 | 32) {
            return Err(Error::ErrAesKeySize);
        }
        self.key = key.as_bytes().to_vec();

        self.encrypt = match matches.value_of("aes-mode") {
            Some("encrypt") | None => true,
            Some("decrypt") => false,
            Some(_) => return Err(Error::ErrAesMode),
        };

        Ok(())
    }

    async fn run(&mut self, buf: &[u8]) -> Result<Bytes> {
        if self.encrypt {
            let iv: [u8; IV_SIZE] = rand::random();
            let mut data = buf.to_vec();
            encrypt_in_place(&self.key, &iv, &mut data)?;

            let mut out = BytesMut::with_capacity(IV_SIZE + data.len());
            out.put_slice(&iv);
            out.put_slice(&data);
            Ok(out.freeze())
        } else {
            if buf.len() < IV_SIZE {
                return Err(Error::ErrAesShortBuffer);
            }

            let mut iv = [0u8; IV_SIZE];
            iv.copy_from_slice(&buf[..IV_SIZE]);

            let mut data = buf[IV_SIZE..].to_vec();
            decrypt_in_place(&self.key, &iv, &mut data)?;
            Ok(Bytes::from(data))
        }
    }
}
