//! Snake board drawing

use super::DrawCmd;
use crate::consts::SNAKE_CELL_PX;
use crate::snake::{CountdownLabel, SnakePhase, SnakeState, countdown_label};
use crate::{board_px, cell_to_px};

const BACKGROUND: &str = "#f0f0f0";
const FOOD: &str = "#F44336";
const HEAD: &str = "#2E7D32";
const BODY: &str = "#4CAF50";
const WHITE: &str = "#fff";
/// Gap between cells
const CELL_GAP: f64 = 2.0;

fn cell(cell: glam::IVec2, color: &str) -> DrawCmd {
    let (x, y) = cell_to_px(cell);
    let size = SNAKE_CELL_PX - CELL_GAP;
    DrawCmd::rect(x, y, size, size, color)
}

fn shade(alpha: f64) -> DrawCmd {
    let side = board_px();
    DrawCmd::rect(0.0, 0.0, side, side, format!("rgba(0, 0, 0, {})", alpha))
}

/// Full frame for the current phase
pub fn snake_frame(state: &SnakeState) -> Vec<DrawCmd> {
    let side = board_px();
    let mid = side / 2.0;
    let mut cmds = vec![DrawCmd::rect(0.0, 0.0, side, side, BACKGROUND)];

    cmds.push(cell(state.food, FOOD));
    for (i, segment) in state.body.iter().enumerate() {
        cmds.push(cell(*segment, if i == 0 { HEAD } else { BODY }));
    }

    match state.phase {
        SnakePhase::Idle => {
            cmds.push(shade(0.6));
            cmds.push(DrawCmd::text("🐍 贪吃蛇游戏", mid, mid - 60.0, "bold 24px Arial", WHITE));
            cmds.push(DrawCmd::text(
                "按任意方向键或空格键开始游戏",
                mid,
                mid - 20.0,
                "18px Arial",
                WHITE,
            ));
            cmds.push(DrawCmd::text(
                "方向键控制移动 | 空格键暂停",
                mid,
                mid + 20.0,
                "14px Arial",
                "#ccc",
            ));
            cmds.push(DrawCmd::text(
                "点击画布聚焦后即可使用键盘控制",
                mid,
                mid + 40.0,
                "14px Arial",
                "#ccc",
            ));
        }
        SnakePhase::Countdown { elapsed_ms } => {
            let label = countdown_label(elapsed_ms);
            cmds.push(shade(0.7));
            cmds.push(DrawCmd::text(label.text(), mid, mid, "bold 48px Arial", WHITE));
            if let CountdownLabel::Number(_) = label {
                cmds.push(DrawCmd::text("准备开始...", mid, mid + 60.0, "20px Arial", WHITE));
            }
        }
        SnakePhase::Paused => {
            cmds.push(shade(0.75));
            cmds.push(DrawCmd::text("游戏暂停", mid, mid - 20.0, "bold 36px Arial", WHITE));
            cmds.push(DrawCmd::text("按空格键继续游戏", mid, mid + 20.0, "18px Arial", WHITE));
        }
        SnakePhase::GameOver => {
            cmds.push(shade(0.75));
            cmds.push(DrawCmd::text("游戏结束!", mid, mid, "30px Arial", WHITE));
            cmds.push(DrawCmd::text(
                format!("分数: {}", state.score),
                mid,
                mid + 40.0,
                "20px Arial",
                WHITE,
            ));
        }
        SnakePhase::Running => {}
    }
    cmds
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec2;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn texts(cmds: &[DrawCmd]) -> Vec<String> {
        cmds.iter()
            .filter_map(|c| match c {
                DrawCmd::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_running_frame_draws_board_only() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut state = SnakeState::new(&mut rng);
        state.phase = SnakePhase::Running;
        state.body.push_back(IVec2::new(9, 10));
        let cmds = snake_frame(&state);
        // background, food, head, one body cell
        assert_eq!(cmds.len(), 4);
        assert_eq!(cmds[2], DrawCmd::rect(200.0, 200.0, 18.0, 18.0, HEAD));
        assert_eq!(cmds[3], DrawCmd::rect(180.0, 200.0, 18.0, 18.0, BODY));
    }

    #[test]
    fn test_overlays() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mut state = SnakeState::new(&mut rng);
        assert!(texts(&snake_frame(&state)).contains(&"🐍 贪吃蛇游戏".to_string()));

        state.phase = SnakePhase::Countdown { elapsed_ms: 1_200.0 };
        assert_eq!(texts(&snake_frame(&state)), vec!["2", "准备开始..."]);

        state.phase = SnakePhase::Countdown { elapsed_ms: 3_100.0 };
        assert_eq!(texts(&snake_frame(&state)), vec!["开始!"]);

        state.phase = SnakePhase::GameOver;
        state.score = 30;
        assert_eq!(texts(&snake_frame(&state)), vec!["游戏结束!", "分数: 30"]);
    }
}
