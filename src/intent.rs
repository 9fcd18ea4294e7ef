//! # 意图与提示词模板
//!
//! 学生选择的“需要什么帮助”是一个有限枚举，每个值对应一条固定模板记录。
//! 这里只做数据选择与拼接，与图片规范化完全无关。

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::submission::ImageRole;

/// 学生选择的分析意图。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    CheckMistake,
    ExplainSolution,
    ValidateApproach,
    TeachMethod,
    ContinueStuck,
    PartialCreditCheck,
}

impl IntentType {
    pub const ALL: [IntentType; 6] = [
        Self::CheckMistake,
        Self::ExplainSolution,
        Self::ValidateApproach,
        Self::TeachMethod,
        Self::ContinueStuck,
        Self::PartialCreditCheck,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::CheckMistake => "check_mistake",
            Self::ExplainSolution => "explain_solution",
            Self::ValidateApproach => "validate_approach",
            Self::TeachMethod => "teach_method",
            Self::ContinueStuck => "continue_stuck",
            Self::PartialCreditCheck => "partial_credit_check",
        }
    }

    pub fn template(self) -> &'static PromptTemplate {
        match self {
            Self::CheckMistake => &CHECK_MISTAKE,
            Self::ExplainSolution => &EXPLAIN_SOLUTION,
            Self::ValidateApproach => &VALIDATE_APPROACH,
            Self::TeachMethod => &TEACH_METHOD,
            Self::ContinueStuck => &CONTINUE_STUCK,
            Self::PartialCreditCheck => &PARTIAL_CREDIT_CHECK,
        }
    }
}

impl std::fmt::Display for IntentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl std::str::FromStr for IntentType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|intent| intent.key() == value)
            .ok_or_else(|| AppError::InvalidSubmission(format!("未知分析意图：{}", value)))
    }
}

/// 单个意图的提示词模板。
#[derive(Debug)]
pub struct PromptTemplate {
    pub role: &'static str,
    pub tasks: &'static [&'static str],
    /// `(小标题, 要点)`
    pub sections: &'static [(&'static str, &'static [&'static str])],
    pub response: ResponseGuide,
}

/// 模板中 JSON 各字段的填写说明。
#[derive(Debug)]
pub struct ResponseGuide {
    pub has_error: &'static str,
    pub error_location: &'static str,
    pub error_explanation: &'static str,
    pub corrective_suggestion: &'static str,
}

const BASE_INSTRUCTION: &str = "あなたは日本の高校生のための優秀な物理の家庭教師です。";

static CHECK_MISTAKE: PromptTemplate = PromptTemplate {
    role: "生徒は自分で解いた問題の計算ミスをチェックしてほしいと思っています。",
    tasks: &[
        "計算過程を丁寧に追う",
        "ミスがあれば具体的に指摘する",
        "なぜそれがミスなのか、物理的・数学的に説明する",
        "同じミスを防ぐための実践的なアドバイスをする",
        "ミスがなければ心から褒め、発展的な視点を提供する",
    ],
    sections: &[(
        "特に注意してチェックする点",
        &[
            "符号のミス（座標系の設定を確認）",
            "単位の換算ミス（m↔cm, kg↔g等）",
            "公式の適用条件",
            "有効数字の処理",
            "計算の論理的な流れ",
        ],
    )],
    response: ResponseGuide {
        has_error: "true または false",
        error_location: "ミスの具体的な場所（例: 3行目の運動方程式）。ミスがない場合は空文字列",
        error_explanation: "なぜミスなのか、物理的・数学的に丁寧に説明。ミスがない場合は空文字列",
        corrective_suggestion: "より良い解法や防止策。ミスがない場合は賞賛と発展的アドバイス",
    },
};

static EXPLAIN_SOLUTION: PromptTemplate = PromptTemplate {
    role: "生徒は模範解答や解説の一部が理解できず、説明してほしいと思っています。",
    tasks: &[
        "画像から、どの部分が分からないのか特定する（赤線、マーカー、疑問符等に注目）",
        "その部分を高校生が理解できる言葉で噛み砕いて説明する",
        "なぜそうなるのか、物理的な背景や意味を説明する",
        "関連する概念や公式も補足する",
        "理解を深めるための確認質問を添える",
    ],
    sections: &[(
        "説明のポイント",
        &[
            "専門用語は最小限に、使う場合は定義も示す",
            "具体例や図的なイメージを添える",
            "「なぜ」を大切に説明する",
            "威圧的にならず、励ましながら",
        ],
    )],
    response: ResponseGuide {
        has_error: "false",
        error_location: "",
        error_explanation: "分からなかった部分の詳しい解説",
        corrective_suggestion: "理解を深めるためのアドバイスと確認のための質問",
    },
};

static VALIDATE_APPROACH: PromptTemplate = PromptTemplate {
    role: "生徒は自分なりの解法で解いていて、それが物理的に正しいか確認したいと思っています。",
    tasks: &[
        "生徒の解法を丁寧に読み取り、理解する",
        "その解法が物理的に正しいか検証する",
        "正しい場合は具体的に褒め、工夫している点を評価し、さらに効率的な方法があれば紹介する",
        "問題がある場合は優しく指摘し、なぜ問題なのか説明し、正しい方向へ導く",
    ],
    sections: &[(
        "評価のポイント",
        &[
            "物理法則に従っているか",
            "数式の展開は正しいか",
            "単位は一貫しているか",
            "解法の効率性",
        ],
    )],
    response: ResponseGuide {
        has_error: "true または false（物理的誤りがあるか）",
        error_location: "問題がある箇所。正しい場合は空文字列",
        error_explanation: "どこがどう良い/問題があるかの説明",
        corrective_suggestion: "改善点や別解の提案。正しい場合は更なる工夫の提案",
    },
};

static TEACH_METHOD: PromptTemplate = PromptTemplate {
    role: "生徒は問題の解き方が分からず、教えてほしいと思っています。",
    tasks: &[
        "問題文を読み取る",
        "解法の方針を示す（どの物理法則を使うか等）",
        "ステップバイステップで解き方を解説する",
        "各ステップの物理的意味を説明する",
        "最後は生徒が自分で解けるよう、ヒントを残す",
    ],
    sections: &[
        (
            "重要な注意点",
            &[
                "答えを丸々教えるのではなく、「考え方」を教える",
                "途中で「ここまで分かる?」的な確認を入れる",
                "公式を使う場合、なぜその公式を使うのか説明する",
                "最終的な答えは示さず、「あとは計算するだけ」で止める",
            ],
        ),
        (
            "教え方のコツ",
            &["段階的に", "丁寧に", "励ましながら", "自力で解く達成感を奪わない"],
        ),
    ],
    response: ResponseGuide {
        has_error: "false",
        error_location: "",
        error_explanation: "問題の解き方をステップバイステップで（答えは示さない）",
        corrective_suggestion: "自分で解くためのヒントと、類似問題への取り組み方",
    },
};

static CONTINUE_STUCK: PromptTemplate = PromptTemplate {
    role: "生徒は問題を途中まで解いたが、そこから先が分からなくなっています。",
    tasks: &[
        "生徒がどこまで解けているか確認する",
        "その部分が正しいか検証する",
        "なぜそこで詰まったのか分析する",
        "次のステップへのヒントを出す（答えは言わない）",
        "自力で解く達成感を大切にする",
    ],
    sections: &[
        (
            "ヒントの出し方",
            &[
                "「次はどの物理量に注目すればいい?」",
                "「この状況で使える公式は?」",
                "「座標系はどう設定した?」",
            ],
        ),
        (
            "避けるべきこと",
            &["答えを直接教える", "次の式を完全に示す", "詰まった原因を決めつける"],
        ),
    ],
    response: ResponseGuide {
        has_error: "false",
        error_location: "詰まっている箇所",
        error_explanation: "なぜそこで詰まったのか、何を考えるべきか",
        corrective_suggestion: "続きを解くためのヒントと考え方（答えは示さない）",
    },
};

static PARTIAL_CREDIT_CHECK: PromptTemplate = PromptTemplate {
    role: "あなたは国公立大学2次試験の採点経験がある物理の教員です。\n生徒は自分の答案で部分点がもらえるか不安に思っています。",
    tasks: &[
        "答案がどこまで到達しているか段階評価する",
        "各採点項目での推定得点を示す",
        "部分点獲得のために不足している要素を挙げる",
        "「ここまで書けば○割確保」という具体的な見通しを示す",
        "採点者視点での改善ポイントを示す",
    ],
    sections: &[(
        "採点基準",
        &[
            "方針点: 正しい物理法則・公式を選択（30-40%）",
            "式の立て方: 必要な式を正確に記述（20-30%）",
            "計算過程: 論理的な式変形（10-20%）",
            "最終解答: 数値と単位の正確性（20-30%）",
            "図示: 適切な図・グラフ（加点要素）",
        ],
    )],
    response: ResponseGuide {
        has_error: "false",
        error_location: "到達している段階",
        error_explanation: "現時点での推定得点と評価",
        corrective_suggestion: "部分点を取るための改善策",
    },
};

/// 拼接完整提示词：基础指令 + 已提供资料列表 + 意图模板。
pub fn build_prompt(intent: IntentType, roles: &[ImageRole]) -> String {
    let template = intent.template();
    let mut prompt = String::new();

    let materials = roles
        .iter()
        .map(|role| format!("- {}", role.material_label()))
        .collect::<Vec<_>>()
        .join("\n");

    // `write!` 到 String 不会失败。
    let _ = write!(
        prompt,
        "{}\n\n生徒から複数の画像が送られてきます:\n{}\n\n",
        BASE_INSTRUCTION, materials
    );

    let _ = write!(prompt, "<役割>\n{}\n\n<あなたがすべきこと>\n", template.role);
    for (index, task) in template.tasks.iter().enumerate() {
        let _ = writeln!(prompt, "{}. {}", index + 1, task);
    }

    for (title, points) in template.sections {
        let _ = write!(prompt, "\n<{}>\n", title);
        for point in *points {
            let _ = writeln!(prompt, "- {}", point);
        }
    }

    let guide = &template.response;
    let _ = write!(
        prompt,
        "\nJSON形式で回答:\n{{\n  \"intentType\": \"{}\",\n  \"hasError\": {},\n  \"errorLocation\": \"{}\",\n  \"errorExplanation\": \"{}\",\n  \"correctiveSuggestion\": \"{}\"\n}}",
        intent.key(),
        guide.has_error,
        guide.error_location,
        guide.error_explanation,
        guide.corrective_suggestion
    );

    prompt
}
