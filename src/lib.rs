//! # ShadeStyle — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 前端 / 命令行 (main.rs)                   │
//! │        上传 · 选色 · 不透明度 · 画笔 · 渲染               │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↕ Result<T, AppError> / Notice
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕           studio::StudioSession                  │
//! │                                                          │
//! │  photo ──→ tone ──→ segmentation ──→ mask ──→ overlay    │
//! │  加载校验   色调     人体分割(candle)   掩码     叠色合成   │
//! │                                                          │
//! │  ┌─ error ────── AppError (统一错误类型)                  │
//! │  ├─ settings ─── StudioConfig (JSON 配置)                 │
//! │  └─ color ────── HexColor (颜色解析)                      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError` |
//! | [`settings`] | 配置文件读取、默认值与校验 |
//! | [`photo`] | 从上传字节/Base64/文件加载照片，类型校验、限额解码、降采样 |
//! | [`tone`] | 平均像素色调分类（暖/冷/中性）与推荐色板 |
//! | [`color`] | 十六进制颜色解析 |
//! | [`mask`] | 掩码缓冲与手动画笔编辑器 |
//! | [`segmentation`] | 人体分割适配器（SegFormer 后端 + 去头后处理） |
//! | [`overlay`] | 按掩码与不透明度叠加纯色图层 |
//! | [`studio`] | 编辑会话状态、渲染规则、用户提示 |

pub mod color;
pub mod error;
pub mod mask;
pub mod overlay;
pub mod photo;
pub mod segmentation;
pub mod settings;
pub mod studio;
pub mod tone;
