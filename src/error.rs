use thiserror::Error;

#[derive(Error, Debug)]
pub enum CropAiError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("画像ファイルではありません: {0}")]
    UnsupportedFile(String),

    #[error("画像が選択されていません")]
    EmptySelection,

    #[error("{mode}モードで選択できるのは最大{limit}枚です（{requested}枚選択）")]
    SelectionLimitExceeded {
        mode: &'static str,
        limit: usize,
        requested: usize,
    },

    #[error("プレビュー生成エラー: {0}")]
    PreviewFailed(String),

    #[error("解析済みの画像が含まれています。新しいバッチを開始してください")]
    BatchNotFresh,

    #[error("不正な状態遷移: {id} ({from})")]
    InvalidTransition { id: String, from: &'static str },

    #[error("解析に失敗しました: {0}")]
    ClassificationFailed(String),

    #[error("履歴に保存するにはログインが必要です。`crop-ai config --set-token TOKEN` で設定してください")]
    NotAuthenticated,

    #[error("解析が完了していない画像は保存できません: {0}")]
    ItemNotCompleted(String),

    #[error("履歴の保存に失敗しました: {0}")]
    SaveFailed(String),

    #[error("履歴ストアエラー: {0}")]
    History(String),

    #[error("入力エラー: {0}")]
    Prompt(String),

    #[error("HTTPエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] crop_ai_common::Error),
}

pub type Result<T> = std::result::Result<T, CropAiError>;
