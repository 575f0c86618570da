use courier_http::Route;

/// 建立路由的下一步操作
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RouteStep {
    /// 直连目标主机
    ConnectTarget,

    /// 连接第一个代理
    ConnectProxy,

    /// 通过代理建立到目标主机的隧道
    TunnelTarget,

    /// 通过代理建立到下一个代理的隧道，参数为下一个代理在路由中的位置
    TunnelProxy(usize),

    /// 在隧道上叠加协议
    LayerProtocol,

    /// 路由已经建立完毕
    Complete,

    /// 当前连接无法到达计划路由
    Unreachable,
}

/// 基础路由指示器
///
/// 比较计划路由和已经建立的路由，给出下一步操作
#[derive(Debug, Copy, Clone, Default)]
pub struct BasicRouteDirector;

impl BasicRouteDirector {
    /// 获取下一步操作
    ///
    /// `fact` 为 [`None`] 表示尚未建立任何连接
    pub fn next_step(&self, plan: &Route, fact: Option<&Route>) -> RouteStep {
        match fact {
            None if plan.hop_count() > 1 => RouteStep::ConnectProxy,
            None => RouteStep::ConnectTarget,
            Some(fact) if plan.hop_count() > 1 => proxied_step(plan, fact),
            Some(fact) => direct_step(plan, fact),
        }
    }
}

fn direct_step(plan: &Route, fact: &Route) -> RouteStep {
    if fact.hop_count() > 1
        || plan.target_host() != fact.target_host()
        || plan.is_secure() != fact.is_secure()
        || plan.local_addr().is_some() && plan.local_addr() != fact.local_addr()
    {
        return RouteStep::Unreachable;
    }
    RouteStep::Complete
}

fn proxied_step(plan: &Route, fact: &Route) -> RouteStep {
    if fact.hop_count() <= 1 || plan.target_host() != fact.target_host() {
        return RouteStep::Unreachable;
    }
    let (plan_hops, fact_hops) = (plan.hop_count(), fact.hop_count());
    if plan_hops < fact_hops {
        return RouteStep::Unreachable;
    }
    if (0..fact_hops - 1).any(|hop| plan.hop_target(hop) != fact.hop_target(hop)) {
        return RouteStep::Unreachable;
    }
    if plan_hops > fact_hops {
        return RouteStep::TunnelProxy(fact_hops - 1);
    }
    if fact.is_tunnelled() && !plan.is_tunnelled() || fact.is_layered() && !plan.is_layered() {
        return RouteStep::Unreachable;
    }
    if plan.is_tunnelled() && !fact.is_tunnelled() {
        return RouteStep::TunnelTarget;
    }
    if plan.is_layered() && !fact.is_layered() {
        return RouteStep::LayerProtocol;
    }
    if plan.is_secure() != fact.is_secure() {
        return RouteStep::Unreachable;
    }
    RouteStep::Complete
}
