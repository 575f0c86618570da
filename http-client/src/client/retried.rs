use std::fmt;

/// 重试统计信息
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RetriedStatsInfo {
    retried_total: usize,
    abandoned_connections: usize,
}

impl RetriedStatsInfo {
    /// 增加重试次数
    #[inline]
    pub fn increase(&mut self) {
        self.retried_total += 1;
    }

    /// 记录一个因传输失败而被丢弃的连接
    #[inline]
    pub fn abandon_connection(&mut self) {
        self.abandoned_connections += 1;
    }

    /// 获取总共重试的次数
    #[inline]
    pub fn retried_total(&self) -> usize {
        self.retried_total
    }

    /// 获取被丢弃的连接数量
    #[inline]
    pub fn abandoned_connections(&self) -> usize {
        self.abandoned_connections
    }
}

impl fmt::Display for RetriedStatsInfo {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.retried_total, self.abandoned_connections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retried_stats() {
        let mut retried = RetriedStatsInfo::default();
        retried.increase();
        retried.abandon_connection();
        retried.increase();
        assert_eq!(retried.retried_total(), 2);
        assert_eq!(retried.abandoned_connections(), 1);
        assert_eq!(retried.to_string(), "2,1");
    }
}
