//! # gestlink
//!
//! GestLink 제스처 스트리밍 클라이언트 바이너리.
//! 설정 로드, 의존성 조립, 세션 실행, 프로필/통계 조회.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use gestlink_core::config::{AppConfig, ConfidencePolicy};
use gestlink_core::config_manager::ConfigManager;
use gestlink_core::models::gesture::{ActionKind, GestureKind};
use gestlink_core::models::profile::{
    ActionMapping, GestureSettings, Profile, ProfileCreate, ProfileUpdate,
};
use gestlink_core::ports::api_client::ProfileApi;
use gestlink_core::ports::camera::{CameraSource, NoCamera};
use gestlink_network::http_client::HttpProfileClient;
use gestlink_network::ws_client::WsConnector;
use gestlink_session::consumers::{GestureTally, JsonLinesPrinter, RecentGestures};
use gestlink_session::lifecycle::LifecycleManager;
use gestlink_session::session::{describe_intervals, SessionRuntime};
use gestlink_vision::encoder::FrameEncoding;
use gestlink_vision::source::ImageSequenceSource;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// GestLink 제스처 스트리밍 클라이언트
#[derive(Parser, Debug)]
#[command(name = "gestlink")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 서버 URL (기본: 설정 파일 값, http://localhost:8000)
    #[arg(long, short = 's', global = true)]
    server: Option<String>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info", global = true)]
    log_level: String,

    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 라이브 제스처 세션 실행 (이벤트를 JSON Lines로 출력)
    Run {
        /// 프로필 범위
        #[arg(long, short = 'p')]
        profile: Option<String>,

        /// 카메라 대신 재생할 이미지 디렉토리
        #[arg(long)]
        source_dir: Option<PathBuf>,

        /// 실행 시간 제한 (초)
        #[arg(long)]
        duration_secs: Option<u64>,

        /// 신뢰도 범위 정책 (reject, clamp)
        #[arg(long)]
        confidence_policy: Option<ConfidencePolicy>,

        /// 통계 폴링 비활성화
        #[arg(long)]
        no_stats: bool,
    },

    /// 데모 시뮬레이터 실행 (백엔드 불필요)
    Demo {
        /// 실행 시간 제한 (초)
        #[arg(long)]
        duration_secs: Option<u64>,
    },

    /// 프로필 관리
    Profiles {
        #[command(subcommand)]
        action: ProfileCommand,
    },

    /// 제스처 통계 조회
    Stats {
        /// 프로필 범위
        #[arg(long, short = 'p')]
        profile: Option<String>,
    },

    /// 제스처 어휘와 액션 매핑 출력
    Gestures,

    /// API 상태 확인
    Health,
}

#[derive(Subcommand, Debug)]
enum ProfileCommand {
    /// 프로필 목록
    List,
    /// 프로필 생성
    Create {
        name: String,
        #[arg(long, short = 'd')]
        description: Option<String>,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// 프로필 조회
    Show { id: String },
    /// 프로필 수정 (설정 변경은 현재 값에 덮어씀)
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, short = 'd')]
        description: Option<String>,
        #[arg(long)]
        active: Option<bool>,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// 프로필 삭제
    Delete { id: String },
}

/// 프로필 제스처 설정 옵션
#[derive(clap::Args, Debug, Default)]
struct SettingsArgs {
    /// 제스처 임계값 (예: fist=0.7, 반복 가능)
    #[arg(long = "threshold", value_name = "GESTURE=VALUE", value_parser = parse_threshold)]
    thresholds: Vec<(GestureKind, f64)>,

    /// 액션 재매핑 (예: fist=right_click, 반복 가능)
    #[arg(long = "map", value_name = "GESTURE=ACTION", value_parser = parse_mapping)]
    mappings: Vec<(GestureKind, ActionKind)>,

    /// 커서 감도 (0.1~3.0)
    #[arg(long)]
    cursor_sensitivity: Option<f64>,

    /// 스크롤 감도 (0.1~3.0)
    #[arg(long)]
    scroll_sensitivity: Option<f64>,

    /// 스무딩 계수 (0~1)
    #[arg(long)]
    smoothing: Option<f64>,
}

impl SettingsArgs {
    fn touches_settings(&self) -> bool {
        !self.thresholds.is_empty()
            || self.cursor_sensitivity.is_some()
            || self.scroll_sensitivity.is_some()
            || self.smoothing.is_some()
    }

    /// 기준 설정에 옵션 적용. 해당 옵션이 없으면 `None`.
    fn settings(&self, base: &GestureSettings) -> Result<Option<GestureSettings>> {
        if !self.touches_settings() {
            return Ok(None);
        }
        let mut settings = base.clone();
        for (gesture, value) in &self.thresholds {
            settings.set_threshold(*gesture, *value)?;
        }
        if let Some(value) = self.cursor_sensitivity {
            settings.cursor_sensitivity = value;
        }
        if let Some(value) = self.scroll_sensitivity {
            settings.scroll_sensitivity = value;
        }
        if let Some(value) = self.smoothing {
            settings.smoothing_factor = value;
        }
        settings.validate()?;
        Ok(Some(settings))
    }

    fn mapping(&self, base: &ActionMapping) -> Result<Option<ActionMapping>> {
        if self.mappings.is_empty() {
            return Ok(None);
        }
        let mut mapping = *base;
        for (gesture, action) in &self.mappings {
            mapping.remap(*gesture, *action)?;
        }
        Ok(Some(mapping))
    }
}

fn split_pair(raw: &str) -> Result<(GestureKind, &str), String> {
    let (gesture, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("GESTURE=VALUE 형식 아님: {raw}"))?;
    let gesture = GestureKind::from_label(gesture.trim())
        .ok_or_else(|| format!("알 수 없는 제스처: {gesture}"))?;
    Ok((gesture, value.trim()))
}

fn parse_threshold(raw: &str) -> Result<(GestureKind, f64), String> {
    let (gesture, value) = split_pair(raw)?;
    let value = value
        .parse::<f64>()
        .map_err(|e| format!("임계값 파싱 실패 ({value}): {e}"))?;
    Ok((gesture, value))
}

fn parse_mapping(raw: &str) -> Result<(GestureKind, ActionKind), String> {
    let (gesture, action) = split_pair(raw)?;
    let action =
        ActionKind::from_label(action).ok_or_else(|| format!("알 수 없는 액션: {action}"))?;
    Ok((gesture, action))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = format!(
        "gestlink={lvl},gestlink_core={lvl},gestlink_network={lvl},gestlink_session={lvl},gestlink_vision={lvl}",
        lvl = args.log_level
    );
    // stdout은 이벤트 출력 전용
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = load_config(args.config.clone())?;
    if let Some(server) = &args.server {
        config.server.base_url = server.clone();
    }

    match args.command {
        Command::Run {
            profile,
            source_dir,
            duration_secs,
            confidence_policy,
            no_stats,
        } => {
            if let Some(dir) = source_dir {
                config.capture.source_dir = Some(dir);
            }
            if let Some(policy) = confidence_policy {
                config.decoder.confidence_policy = policy;
            }
            if no_stats {
                config.stats.enabled = false;
            }
            config.validate()?;
            run_session(config, profile, duration_secs).await
        }
        Command::Demo { duration_secs } => {
            config.validate()?;
            run_demo(config, duration_secs).await
        }
        Command::Profiles { action } => {
            let api = api_client(&config)?;
            run_profile_command(api.as_ref(), action).await
        }
        Command::Stats { profile } => {
            let api = api_client(&config)?;
            print_stats(api.as_ref(), profile.as_deref()).await
        }
        Command::Gestures => {
            print_gestures();
            Ok(())
        }
        Command::Health => {
            let api = api_client(&config)?;
            let health = api.health().await?;
            println!("{} v{} ({})", health.message, health.version, health.status);
            Ok(())
        }
    }
}

/// 설정 로드 (CLI 경로 또는 플랫폼 기본 경로)
fn load_config(path: Option<PathBuf>) -> Result<AppConfig> {
    let manager = match path {
        Some(path) => ConfigManager::with_path(path)?,
        None => match ConfigManager::new() {
            Ok(manager) => manager,
            Err(e) => {
                warn!("설정 파일 로드 실패, 기본값 사용: {e}");
                return Ok(AppConfig::default_config());
            }
        },
    };
    info!("설정 파일: {}", manager.config_path().display());
    Ok(manager.get())
}

fn api_client(config: &AppConfig) -> Result<Arc<dyn ProfileApi>> {
    let client = HttpProfileClient::new(&config.server.base_url, config.server.request_timeout())?;
    Ok(Arc::new(client))
}

/// 카메라 소스 결정
fn camera_source(config: &AppConfig) -> Result<Box<dyn CameraSource>> {
    match &config.capture.source_dir {
        Some(dir) => {
            let encoding = FrameEncoding {
                width: config.capture.frame_width,
                height: config.capture.frame_height,
                quality: config.capture.jpeg_quality,
            };
            let source = ImageSequenceSource::from_dir(dir, encoding)
                .with_context(|| format!("이미지 소스 로드 실패: {}", dir.display()))?;
            Ok(Box::new(source))
        }
        None => {
            warn!("카메라 소스 없음: 모든 캡처 틱이 건너뛰어짐 (--source-dir 지정 필요)");
            Ok(Box::new(NoCamera))
        }
    }
}

async fn run_session(
    config: AppConfig,
    profile: Option<String>,
    duration_secs: Option<u64>,
) -> Result<()> {
    info!("라이브 세션: {} ({})", config.server.base_url, describe_intervals(&config));

    let tally = Arc::new(GestureTally::new());
    let recent = Arc::new(RecentGestures::new());
    let camera = camera_source(&config)?;
    let api = api_client(&config)?;

    let controller = SessionRuntime::new(config, Arc::new(WsConnector::new()), camera)
        .with_api(api)
        .with_profile(profile)
        .with_consumer(Arc::new(JsonLinesPrinter::new(std::io::stdout())))
        .with_consumer(tally.clone())
        .with_consumer(recent.clone())
        .spawn();

    controller.start().await?;

    let lifecycle = LifecycleManager::new();
    lifecycle
        .wait_for_signal(duration_secs.map(Duration::from_secs))
        .await;

    let snapshot = controller.snapshot().await?;
    controller.shutdown().await?;

    info!(
        "세션 종료: 전송 {}프레임, 이벤트 {}건, 디코딩 에러 {}건",
        snapshot.frames_sent, snapshot.events_delivered, snapshot.decode_errors
    );
    for (gesture, count) in tally.sorted() {
        info!("  {} {}: {}", gesture.emoji(), gesture, count);
    }
    if let Some(last) = recent.snapshot().first() {
        info!("마지막 제스처: {} ({})", last.gesture(), last.received_at);
    }
    Ok(())
}

async fn run_demo(config: AppConfig, duration_secs: Option<u64>) -> Result<()> {
    info!("데모 모드: {}ms 주기", config.demo.interval_ms);

    let controller = SessionRuntime::new(
        config,
        Arc::new(WsConnector::new()),
        Box::new(NoCamera),
    )
    .with_consumer(Arc::new(JsonLinesPrinter::new(std::io::stdout())))
    .spawn();

    controller.start_demo().await?;
    LifecycleManager::new()
        .wait_for_signal(duration_secs.map(Duration::from_secs))
        .await;
    controller.shutdown().await?;
    Ok(())
}

async fn run_profile_command(api: &dyn ProfileApi, action: ProfileCommand) -> Result<()> {
    match action {
        ProfileCommand::List => {
            let profiles = api.list_profiles().await?;
            if profiles.is_empty() {
                println!("프로필 없음");
            }
            for profile in profiles {
                println!(
                    "{}\t{}\t{}\t{}",
                    profile.id,
                    profile.name,
                    if profile.is_active { "active" } else { "inactive" },
                    profile.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        ProfileCommand::Create {
            name,
            description,
            settings,
        } => {
            let request = ProfileCreate {
                description,
                gesture_settings: settings.settings(&GestureSettings::default())?,
                action_mapping: settings.mapping(&ActionMapping::default())?,
                ..ProfileCreate::new(name)
            };
            let profile = api.create_profile(&request).await?;
            print_profile(&profile)?;
        }
        ProfileCommand::Show { id } => {
            let profile = api.get_profile(&id).await?;
            print_profile(&profile)?;
        }
        ProfileCommand::Update {
            id,
            name,
            description,
            active,
            settings,
        } => {
            // 서버는 설정 객체를 통째로 교체하므로 현재 값을 기준으로 병합
            let (gesture_settings, action_mapping) =
                if settings.touches_settings() || !settings.mappings.is_empty() {
                    let current = api.get_profile(&id).await?;
                    (
                        settings.settings(&current.gesture_settings)?,
                        settings.mapping(&current.action_mapping)?,
                    )
                } else {
                    (None, None)
                };
            let update = ProfileUpdate {
                name,
                description,
                gesture_settings,
                action_mapping,
                is_active: active,
            };
            if update.is_empty() {
                return Err(anyhow!(
                    "수정할 항목 없음 (--name, --description, --active, --threshold, --map, ...)"
                ));
            }
            let profile = api.update_profile(&id, &update).await?;
            print_profile(&profile)?;
        }
        ProfileCommand::Delete { id } => {
            api.delete_profile(&id).await?;
            println!("삭제됨: {id}");
        }
    }
    Ok(())
}

/// 프로필 JSON과 제스처별 임계값/액션 표 출력
fn print_profile(profile: &Profile) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(profile)?);
    for gesture in GestureKind::RECOGNIZED {
        let threshold = profile
            .gesture_settings
            .threshold(gesture)
            .map(|t| format!("{t:.2}"))
            .unwrap_or_default();
        println!(
            "{} {:<12} → {:<12} (임계값 {})",
            gesture.emoji(),
            gesture.as_str(),
            profile.action_mapping.action_for(gesture).as_str(),
            threshold
        );
    }
    let settings = &profile.gesture_settings;
    println!(
        "커서 감도 {:.1}, 스크롤 감도 {:.1}, 스무딩 {:.2}",
        settings.cursor_sensitivity, settings.scroll_sensitivity, settings.smoothing_factor
    );
    Ok(())
}

/// 통계 출력. 조회 실패 시 경고 후 "데이터 없음"으로 대체한다.
async fn print_stats(api: &dyn ProfileApi, profile: Option<&str>) -> Result<()> {
    let stats = match api.gesture_stats(profile).await {
        Ok(stats) => stats,
        Err(e) => {
            warn!("통계 조회 실패: {e}");
            Default::default()
        }
    };

    if stats.is_empty() {
        println!("데이터 없음");
        return Ok(());
    }
    println!("전체 제스처: {}", stats.total_gestures);
    for (label, count) in stats.sorted_counts() {
        let emoji = GestureKind::from_label(label)
            .unwrap_or(GestureKind::Unknown)
            .emoji();
        println!("  {emoji} {label}: {count}");
    }
    Ok(())
}

fn print_gestures() {
    for gesture in GestureKind::RECOGNIZED {
        let threshold = gesture
            .default_threshold()
            .map(|t| format!("{t:.2}"))
            .unwrap_or_default();
        println!(
            "{} {:<12} → {:<12} (임계값 {})",
            gesture.emoji(),
            gesture.as_str(),
            gesture.default_action().as_str(),
            threshold
        );
    }
}
