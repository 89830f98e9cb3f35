use std::path::PathBuf;

use clap::{ArgAction, Parser};

const ASCII_LOGO: &str = r#"
         _______     _______   _   _           _       _____
        |  ___\ \   / / ____| | | | | __ _ ___| |__   |  ___|__  _ __ __ _  ___
        | |_   \ \ / /|  _|   | |_| |/ _` / __| '_ \  | |_ / _ \| '__/ _` |/ _ \
        |  _|   \ V / | |___  |  _  | (_| \__ \ | | | |  _| (_) | | | (_| |  __/
        |_|      \_/  |_____| |_| |_|\__,_|___/_| |_| |_|  \___/|_|  \__, |\___|
                                                                     |___/
"#;

const EXAMPLES: &str = r#"
ПРИМЕРЫ ИСПОЛЬЗОВАНИЯ:

  1. ОБРАЗ РАЗДЕЛА
     Том BitLocker начинается с нулевого байта образа:
     fve_hash_forge bitlocker.raw

  2. ОБРАЗ ВСЕГО ДИСКА
     Раздел BitLocker начинается с сектора 2048 (смещение можно задать в hex или десятичном виде):
     fve_hash_forge disk.dd --offset 0x100000

     Или коротко:
     fve_hash_forge disk.dd -o 1048576

  3. ОТЧЁТ JSONL И СВЕРКА КОПИЙ
     Дополнительно сохранить хэши в JSONL и сверить три копии метаданных FVE:
     fve_hash_forge disk.dd -o 0x100000 --out-json hashes.jsonl --all-copies

ФОРМАТЫ ХЭШЕЙ:
  $bitlocker$0$ / $bitlocker$1$  VMK защищён паролем пользователя
  $bitlocker$2$ / $bitlocker$3$  VMK защищён паролем восстановления
  VMK под защитой TPM превратить в хэш нельзя.

Подробная трассировка разбора: RUST_LOG=fve_hash_forge=debug
"#;

#[derive(Parser, Debug)]
#[command(name = "fve_hash_forge")]
#[command(version = "1.0")]
#[command(before_help = ASCII_LOGO)] // Логотип НАД меню
#[command(about = "DFIR tool for extracting BitLocker password and recovery key hashes from raw images")]
#[command(after_help = EXAMPLES)]    // Примеры ПОД меню
pub struct Cli {
    /// Сырой образ диска или раздела с томом BitLocker
    pub image: PathBuf,

    /// Смещение начала раздела BitLocker в образе (десятичное или 0x-hex)
    #[arg(short, long, default_value = "0", value_parser = parse_offset)]
    pub offset: u64,

    /// Дополнительно записать каждый хэш отдельной JSON-строкой в этот файл
    #[arg(short = 'j', long)]
    pub out_json: Option<PathBuf>,

    /// Разобрать все три копии метаданных и предупредить о расхождениях
    #[arg(long)]
    pub all_copies: bool,

    /// Больше логов в stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

// "0x100000", "0X1F" или "1048576"
pub fn parse_offset(value: &str) -> Result<u64, String> {
    let value = value.trim();
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex_digits) => u64::from_str_radix(hex_digits, 16),
        None => value.parse::<u64>(),
    };
    parsed.map_err(|e| format!("invalid offset '{}': {}", value, e))
}
