//! Fixed agent and weapon vocabularies, grouped the way the picker shows them.

pub const AGENTS: &[(&str, &[&str])] = &[
    ("先锋", &["钛狐", "铁臂", "猎枭", "斯凯", "K/O", "黑梦", "盖可"]),
    (
        "决斗",
        &["捷风", "雷兹", "不死鸟", "芮娜", "夜露", "霓虹", "壹决", "幻棱"],
    ),
    ("控场", &["幽影", "炼狱", "蝰蛇", "星礈", "海神", "暮蝶"]),
    ("哨卫", &["贤者", "零", "奇乐", "尚勃勒", "钢锁", "维斯", "禁灭"]),
];

pub const WEAPONS: &[(&str, &[&str])] = &[
    ("手枪", &["标配", "短炮", "狂怒", "鬼魅", "追猎", "正义"]),
    ("冲锋枪", &["蜂刺", "骇灵"]),
    ("霰弹枪", &["雄鹿", "判官"]),
    ("步枪", &["獠犬", "戍卫", "幻影", "狂徒"]),
    ("狙击枪", &["飞将", "莽侠", "冥驹"]),
    ("机枪", &["战神", "奥丁"]),
];

pub fn agents() -> impl Iterator<Item = &'static str> {
    AGENTS.iter().flat_map(|(_, names)| names.iter().copied())
}

pub fn weapons() -> impl Iterator<Item = &'static str> {
    WEAPONS.iter().flat_map(|(_, names)| names.iter().copied())
}

pub fn is_agent(name: &str) -> bool {
    agents().any(|a| a == name)
}

pub fn is_weapon(name: &str) -> bool {
    weapons().any(|w| w == name)
}
